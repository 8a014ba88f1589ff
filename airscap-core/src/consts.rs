//! Protocol constants

/// Network ports used by the ScanSnap protocol.
pub mod ports {
    /// UDP: scanner advertisement broadcast
    pub const BROADCAST: u16 = 53220;

    /// UDP: scanner-side discovery + heartbeat
    pub const DISCOVERY: u16 = 52217;

    /// TCP: data channel
    pub const DEFAULT_DATA: u16 = 53218;

    /// TCP: control channel
    pub const DEFAULT_CONTROL: u16 = 53219;

    /// UDP: client-side discovery response
    pub const CLIENT_DISCOVERY: u16 = 55264;

    /// UDP: client-side event notification (button press)
    pub const CLIENT_NOTIFY: u16 = 55265;
}

/// Control channel commands (TCP:53219).
pub mod control {
    /// Reserve scanner (send identity / client config)
    pub const CMD_RESERVE: u32 = 0x11;

    /// Release scanner (register / deregister session)
    pub const CMD_RELEASE: u32 = 0x12;

    /// Query scanner WiFi / connection status
    pub const CMD_GET_WIFI_STATUS: u32 = 0x30;

    /// Release action values.
    pub const RELEASE_DEREGISTER: u32 = 0;
    pub const RELEASE_REGISTER: u32 = 1;

    /// Reserve status meaning the identity was rejected.
    pub const RESERVE_REJECTED: u32 = 0xFFFF_FFFD;
}

/// Data channel command words (TCP:53218).
///
/// The value at frame offset 32 is the SCSI CDB byte length and
/// discriminates the command family: 0x06 = 6-byte CDB, 0x08 = 8-byte,
/// 0x0A = 10-byte, 0x0C = 12-byte.
pub mod cdb {
    pub const LEN6: u32 = 0x06;
    pub const LEN8: u32 = 0x08;
    pub const LEN10: u32 = 0x0A;
    pub const LEN12: u32 = 0x0C;
}

/// SCSI opcodes (CDB byte 0).
pub mod scsi {
    /// REQUEST SENSE
    pub const REQUEST_SENSE: u8 = 0x03;

    /// INQUIRY (with or without EVPD)
    pub const INQUIRY: u8 = 0x12;

    /// READ(10), page transfer
    pub const READ10: u8 = 0x28;

    /// Vendor opcodes.
    pub const READ_SETTINGS: u8 = 0xD8;
    pub const WRITE_SCAN_CONFIG: u8 = 0xD4;
    pub const PREPARE_SCAN: u8 = 0xD5;
    pub const END_SCAN: u8 = 0xD6;
    pub const WAIT_FOR_SCAN: u8 = 0xE0;
    pub const GET_STATUS: u8 = 0xC2;
    pub const SET_CONFIG: u8 = 0xEB;
    pub const WRITE_TONE_CURVE: u8 = 0xDB;
}

/// Broadcast advertisement command word.
pub const CMD_BROADCAST: u32 = 0x21;

/// Event notification type for a scan-button press.
pub const EVENT_SCAN_BUTTON: u32 = 1;

/// Size of the welcome packet at TCP connection start.
pub const WELCOME_SIZE: usize = 16;

/// Size of the page header preceding each image chunk.
pub const PAGE_HEADER_SIZE: usize = 42;

/// Page type values in the page header.
pub const PAGE_TYPE_MORE: u32 = 0x00;
pub const PAGE_TYPE_FINAL: u32 = 0x02;

/// Bytes requested per page transfer chunk (256 KiB).
pub const PAGE_TRANSFER_LEN: u32 = 0x0004_0000;

/// Scan status bitmask (uint32 at GET STATUS response offset 40).
pub mod status {
    /// Offset of the scan status word in a GET STATUS response.
    pub const SCAN_STATUS_OFFSET: usize = 40;

    /// Offset of the 16-bit error code in a GET STATUS response.
    pub const ERROR_CODE_OFFSET: usize = 44;

    /// Offset of the status word in a WAIT FOR SCAN response.
    pub const WAIT_STATUS_OFFSET: usize = 12;

    /// ADF cover open
    pub const COVER_OPEN: u32 = 0x0020;

    /// No paper in the ADF (bit set = empty)
    pub const NO_PAPER: u32 = 0x0080;

    /// Paper jam
    pub const PAPER_JAM: u32 = 0x8000;

    /// Error code denoting a multi-feed.
    pub const ERROR_CODE_MULTI_FEED: u16 = 0x0155;
}

/// SCSI sense data fields (at offset 40 of a REQUEST SENSE response).
pub mod sense {
    /// Offset of the sense data block in the response.
    pub const DATA_OFFSET: usize = 40;

    /// Sense keys (low nibble of sense byte 2).
    pub const KEY_NO_SENSE: u8 = 0x00;
    pub const KEY_NOT_READY: u8 = 0x02;
    pub const KEY_MEDIUM_ERROR: u8 = 0x03;

    /// Vendor ASC for scanner conditions.
    pub const VENDOR_ASC: u8 = 0x80;

    /// ASCQ values under `VENDOR_ASC`.
    pub const ASCQ_PAPER_JAM: u8 = 0x01;
    pub const ASCQ_COVER_OPEN: u8 = 0x02;
    pub const ASCQ_SCAN_COMPLETE: u8 = 0x03;
    pub const ASCQ_MULTI_FEED: u8 = 0x07;
}
