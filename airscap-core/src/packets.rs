//! VENS packet encoding and decoding
//!
//! Every packet begins with a 4-byte total length (included in itself)
//! followed by the magic `VENS`, except the 32-byte UDP discovery
//! packets which lead with the magic directly. All integers are
//! big-endian.
//!
//! Data channel frames (TCP:53218) carry a SCSI CDB at offset 48:
//!
//! ```text
//! ┌────────┬───────┬───────────┬─────┬─────────┬─────┬─────────┬────────────┬─────┐
//! │  Size  │ Magic │ Direction │ pad │  Token  │ pad │ CDB len │ param area │ CDB │
//! │ 4 bytes│ 4 B   │  4 B      │ 4 B │  8 B    │ 8 B │  4 B    │  12 B      │ ... │
//! └────────┴───────┴───────────┴─────┴─────────┴─────┴─────────┴────────────┴─────┘
//! ```
//!
//! Direction is 1 for client→scanner. The CDB length word (6/8/10/12)
//! discriminates the command family.

use std::net::Ipv4Addr;

use bytes::Bytes;
use chrono::{Datelike, Timelike};

use airscap_types::{AdfStatus, DataDeviceInfo, DeviceInfo, ScanParams};

use crate::consts::{
    cdb, control, scsi, status, CMD_BROADCAST, PAGE_HEADER_SIZE, PAGE_TRANSFER_LEN,
    PAGE_TYPE_FINAL, WELCOME_SIZE,
};
use crate::error::{Error, Result};
use crate::frame::{get_u16, get_u32, ip_from_bytes, mac_to_string, null_terminated, Frame};
use crate::token::SessionToken;
use crate::{MAGIC, MAGIC_SSNR};

fn check_magic(what: &'static str, data: &[u8], off: usize) -> Result<()> {
    if data[off..off + 4] != MAGIC {
        return Err(Error::bad_magic(what));
    }
    Ok(())
}

// --------------------------------------------------------------------------
// UDP packets
// --------------------------------------------------------------------------

/// Build a 32-byte VENS discovery or heartbeat packet (UDP:52217).
///
/// The flags word at offset 4 is 0 for discovery and 1 for heartbeat.
pub fn discovery_packet(
    client_ip: Ipv4Addr,
    token: &SessionToken,
    client_port: u16,
    heartbeat: bool,
) -> Bytes {
    let mut p = Frame::new(32);
    p.put_bytes(0, &MAGIC);
    if heartbeat {
        p.put_u32(4, 1);
    }
    p.put_ip(8, client_ip);
    p.put_bytes(12, token.as_bytes());
    p.put_u16(22, client_port);
    p.put_u8(24, 0x00);
    p.put_u8(25, 0x10);
    p.freeze()
}

/// Build the 32-byte ssNR companion discovery packet.
pub fn discovery_ssnr_packet(client_ip: Ipv4Addr, token: &SessionToken, client_port: u16) -> Bytes {
    let mut p = Frame::new(32);
    p.put_bytes(0, &MAGIC_SSNR);
    p.put_ip(8, client_ip);
    p.put_bytes(12, token.as_bytes());
    p.put_u16(22, client_port);
    p.put_u8(24, 0x01);
    p.freeze()
}

/// Parse a 48-byte scanner advertisement broadcast (UDP:53220),
/// returning the advertised device IP.
pub fn parse_broadcast_advertisement(data: &[u8]) -> Result<Ipv4Addr> {
    if data.len() < 48 {
        return Err(Error::too_short("broadcast advertisement", 48, data.len()));
    }
    check_magic("broadcast advertisement", data, 4)?;
    let command = get_u32(data, 8);
    if command != CMD_BROADCAST {
        return Err(Error::UnexpectedCommand { what: "broadcast advertisement", command });
    }
    Ok(ip_from_bytes(&data[20..24]))
}

/// Parse a 132-byte device info response (UDP:55264).
pub fn parse_device_info(data: &[u8]) -> Result<DeviceInfo> {
    if data.len() < 132 {
        return Err(Error::too_short("device info", 132, data.len()));
    }
    check_magic("device info", data, 0)?;

    let client_ip = ip_from_bytes(&data[120..124]);
    Ok(DeviceInfo {
        paired: get_u16(data, 4) != 0,
        device_ip: ip_from_bytes(&data[16..20]),
        data_port: get_u16(data, 22),
        control_port: get_u16(data, 26),
        mac: mac_to_string(&data[28..34]),
        state: get_u32(data, 36),
        serial: null_terminated(&data[40..104]),
        name: null_terminated(&data[104..120]),
        client_ip: if client_ip.is_unspecified() { None } else { Some(client_ip) },
    })
}

/// Parse a 48-byte event notification (UDP:55265) into
/// `(event_type, event_data)`.
pub fn parse_event_notification(data: &[u8]) -> Result<(u32, u32)> {
    if data.len() < 48 {
        return Err(Error::too_short("event notification", 48, data.len()));
    }
    check_magic("event notification", data, 4)?;
    Ok((get_u32(data, 8), get_u32(data, 16)))
}

// --------------------------------------------------------------------------
// TCP control channel packets (port 53219)
// --------------------------------------------------------------------------

/// Validate the 16-byte welcome packet the scanner sends on every new
/// TCP connection.
pub fn validate_welcome(data: &[u8]) -> Result<()> {
    if data.len() < WELCOME_SIZE {
        return Err(Error::too_short("welcome packet", WELCOME_SIZE, data.len()));
    }
    check_magic("welcome packet", data, 4)
}

/// Build a 384-byte reserve request carrying the client configuration:
/// IP, notification port, pairing identity, and a local timestamp.
///
/// An empty identity falls back to the concatenated decimal octets of
/// the client IP.
pub fn reserve_request(
    token: &SessionToken,
    client_ip: Ipv4Addr,
    notify_port: u16,
    identity: &str,
    ts: chrono::DateTime<chrono::Local>,
) -> Bytes {
    let mut p = Frame::new(384);
    p.put_u32(0, 384);
    p.put_bytes(4, &MAGIC);
    p.put_u32(8, control::CMD_RESERVE);
    p.put_bytes(16, token.as_bytes());

    // Config block
    p.put_u32(32, 0x0004_0500);
    p.put_u32(36, 0x0000_0001);
    p.put_u32(40, 0x0000_0001);
    p.put_ip(44, client_ip);
    p.put_u16(50, notify_port);

    // Identity string at offset 52, max 48 bytes
    let fallback;
    let id_bytes = if identity.is_empty() {
        let o = client_ip.octets();
        fallback = format!("{}{}{}{}", o[0], o[1], o[2], o[3]);
        fallback.as_bytes()
    } else {
        identity.as_bytes()
    };
    let id_bytes = &id_bytes[..id_bytes.len().min(48)];
    p.put_bytes(52, id_bytes);

    // Timestamp at offset 100: year u16, month, day, hour, minute, second, pad
    p.put_u16(100, ts.year() as u16);
    p.put_u8(102, ts.month() as u8);
    p.put_u8(103, ts.day() as u8);
    p.put_u8(104, ts.hour() as u8);
    p.put_u8(105, ts.minute() as u8);
    p.put_u8(106, ts.second() as u8);

    // Client type constant
    p.put_u32(116, 0xFFFF_8170);
    p.freeze()
}

/// Build a 32-byte release request (register / deregister session).
pub fn release_request(token: &SessionToken, action: u32) -> Bytes {
    let mut p = Frame::new(32);
    p.put_u32(0, 32);
    p.put_bytes(4, &MAGIC);
    p.put_u32(8, control::CMD_RELEASE);
    p.put_bytes(16, token.as_bytes());
    p.put_u32(24, action);
    p.freeze()
}

/// Build a 32-byte WiFi status request.
pub fn wifi_status_request(token: &SessionToken) -> Bytes {
    let mut p = Frame::new(32);
    p.put_u32(0, 32);
    p.put_bytes(4, &MAGIC);
    p.put_u32(8, control::CMD_GET_WIFI_STATUS);
    p.put_bytes(16, token.as_bytes());
    p.freeze()
}

/// Extract the status code from a 20-byte reserve response.
pub fn parse_reserve_response(data: &[u8]) -> Result<u32> {
    if data.len() < 20 {
        return Err(Error::too_short("reserve response", 20, data.len()));
    }
    Ok(get_u32(data, 8))
}

/// Extract the state field from a 32-byte WiFi status response.
pub fn parse_wifi_status_response(data: &[u8]) -> Result<u32> {
    if data.len() < 32 {
        return Err(Error::too_short("wifi status response", 32, data.len()));
    }
    Ok(get_u32(data, 16))
}

// --------------------------------------------------------------------------
// TCP data channel packets (port 53218)
// --------------------------------------------------------------------------

/// Build a data channel request: 36-byte header + parameter area.
pub(crate) fn data_request(token: &SessionToken, cdb_len: u32, params: &[u8]) -> Bytes {
    let total = 36 + params.len();
    let mut p = Frame::new(total);
    p.put_u32(0, total as u32);
    p.put_bytes(4, &MAGIC);
    p.put_u32(8, 1); // direction = client→scanner
    p.put_bytes(16, token.as_bytes());
    p.put_u32(32, cdb_len);
    p.put_bytes(36, params);
    p.freeze()
}

/// Build the INQUIRY request for device identity.
/// CDB: `12 00 00 00 60 00` (allocation 0x60).
pub fn get_device_info(token: &SessionToken) -> Bytes {
    let mut p = Frame::new(28);
    p.put_u32(0, 0x0000_0060);
    p.put_u8(12, scsi::INQUIRY);
    p.put_u8(16, 0x60);
    data_request(token, cdb::LEN6, &p.freeze())
}

/// Build the INQUIRY VPD request for scanner capabilities.
/// CDB: `12 01 F0 00 90 00` (EVPD=1, page 0xF0, allocation 0x90).
pub fn get_scan_params(token: &SessionToken) -> Bytes {
    let mut p = Frame::new(28);
    p.put_u32(0, 0x0000_0090);
    p.put_u8(12, scsi::INQUIRY);
    p.put_u8(13, 0x01);
    p.put_u8(14, 0xF0);
    p.put_u8(16, 0x90);
    data_request(token, cdb::LEN6, &p.freeze())
}

/// Build the read-stored-settings request. CDB: `D8 00 00 00 00 00`.
pub fn get_scan_settings(token: &SessionToken) -> Bytes {
    let mut p = Frame::new(28);
    p.put_u8(12, scsi::READ_SETTINGS);
    data_request(token, cdb::LEN6, &p.freeze())
}

/// Build the initial session configuration command (0xEB).
///
/// Carries the `0x05010000` sub-config observed on the wire; its
/// meaning is unknown and it is reproduced verbatim.
pub fn set_config(token: &SessionToken) -> Bytes {
    let mut p = Frame::new(32);
    p.put_u32(4, 0x0000_0004);
    p.put_u8(12, scsi::SET_CONFIG);
    p.put_u32(16, 0x0004_0000);
    p.put_u32(28, 0x0501_0000);
    data_request(token, cdb::LEN8, &p.freeze())
}

/// Build the scan status request.
/// CDB: `C2 00 00 00 00 00 00 00 20 00` (allocation 32).
pub fn get_status(token: &SessionToken) -> Bytes {
    let mut p = Frame::new(28);
    p.put_u32(0, 0x0000_0020);
    p.put_u8(12, scsi::GET_STATUS);
    p.put_u8(20, 0x20);
    data_request(token, cdb::LEN10, &p.freeze())
}

/// Build the arm-the-scanner request. CDB: `D5 00 00 00 08 08`.
pub fn prepare_scan(token: &SessionToken) -> Bytes {
    let mut p = Frame::new(36);
    p.put_u32(0, 0x0000_0008);
    p.put_u32(4, 0x0000_0008);
    p.put_u8(12, scsi::PREPARE_SCAN);
    p.put_u8(16, 0x08);
    p.put_u8(17, 0x08);
    data_request(token, cdb::LEN6, &p.freeze())
}

/// Build the blocking wait-for-scan request. CDB: `E0 00 00 00 00 00`.
pub fn wait_for_scan(token: &SessionToken) -> Bytes {
    let mut p = Frame::new(28);
    p.put_u8(12, scsi::WAIT_FOR_SCAN);
    data_request(token, cdb::LEN6, &p.freeze())
}

/// Build the end-scan request that resets scanner state at session end.
/// CDB: `D6 00 00 00 00 00`.
pub fn end_scan(token: &SessionToken) -> Bytes {
    let mut p = Frame::new(28);
    p.put_u8(12, scsi::END_SCAN);
    data_request(token, cdb::LEN6, &p.freeze())
}

/// Build the REQUEST SENSE command used for page metadata and error
/// classification. CDB: `03 00 00 00 12 00` (allocation 18).
pub fn get_page_metadata(token: &SessionToken) -> Bytes {
    let mut p = Frame::new(28);
    p.put_u32(0, 0x0000_0012);
    p.put_u8(12, scsi::REQUEST_SENSE);
    p.put_u8(16, 0x12);
    data_request(token, cdb::LEN6, &p.freeze())
}

/// Build a page transfer request for one 256 KiB chunk.
///
/// 12-byte READ(10) extended CDB:
/// - byte 0: opcode 0x28
/// - byte 2: data type 0x00 (image data)
/// - byte 3: transfer mode 0x02 (block until available)
/// - byte 5: 0x00 front side / 0x80 back side
/// - bytes 6-8: transfer length 0x040000, big-endian
/// - byte 10: transfer sheet index (advances per side)
/// - byte 11: chunk index within the side
pub fn page_transfer(token: &SessionToken, sheet: u8, chunk: u8, back_side: bool) -> Bytes {
    let mut p = Frame::new(28);
    p.put_u32(0, PAGE_TRANSFER_LEN);
    p.put_u8(12, scsi::READ10);
    p.put_u8(15, 0x02);
    if back_side {
        p.put_u8(17, 0x80);
    }
    p.put_u8(18, (PAGE_TRANSFER_LEN >> 16) as u8);
    p.put_u8(22, sheet);
    p.put_u8(23, chunk);
    data_request(token, cdb::LEN12, &p.freeze())
}

// --------------------------------------------------------------------------
// Data channel response parsers
// --------------------------------------------------------------------------

/// Parse the 136-byte INQUIRY response: device name at offset 48
/// (33 bytes, NUL-terminated) and firmware revision extracted as the
/// last whitespace-delimited token of the trimmed name.
pub fn parse_data_device_info(data: &[u8]) -> Result<DataDeviceInfo> {
    if data.len() < 136 {
        return Err(Error::too_short("device info response", 136, data.len()));
    }
    let device_name = null_terminated(&data[48..81]);
    // "FUJITSU ScanSnap iX500  0M00" → revision "0M00"
    let trimmed = device_name.trim_end_matches(' ');
    let firmware_revision = match trimmed.rfind(' ') {
        Some(i) => trimmed[i + 1..].to_string(),
        None => String::new(),
    };
    Ok(DataDeviceInfo { device_name, firmware_revision })
}

/// Parse the INQUIRY VPD 0xF0 response into scanner capabilities.
///
/// Width and height arrive in 1/600 inch and are doubled into the
/// 1/1200-inch unit used everywhere else.
pub fn parse_scan_params(data: &[u8]) -> Result<ScanParams> {
    if data.len() < 68 {
        return Err(Error::too_short("scan params response", 68, data.len()));
    }
    check_magic("scan params response", data, 4)?;
    Ok(ScanParams {
        max_resolution_x: get_u16(data, 45),
        max_resolution_y: get_u16(data, 47),
        color_modes: data[49],
        min_resolution_x: get_u16(data, 54),
        min_resolution_y: get_u16(data, 56),
        max_width: (u32::from(get_u16(data, 62)) * 2) as u16,
        max_height: (u32::from(get_u16(data, 66)) * 2) as u16,
    })
}

/// The 42-byte header preceding each image chunk during page transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    /// Header (42) + image chunk size
    pub total_length: u32,

    /// 0 = more chunks follow, 2 = final chunk of this side
    pub page_type: u32,

    pub sheet: u8,

    /// 0 = front, 1 = back
    pub side: u8,
}

impl PageHeader {
    /// Number of image bytes following this header.
    pub fn image_size(&self) -> usize {
        (self.total_length as usize).saturating_sub(PAGE_HEADER_SIZE)
    }

    /// Whether this is the last chunk of the side.
    pub fn is_final(&self) -> bool {
        self.page_type == PAGE_TYPE_FINAL
    }
}

/// Parse a 42-byte page header.
pub fn parse_page_header(data: &[u8]) -> Result<PageHeader> {
    if data.len() < PAGE_HEADER_SIZE {
        return Err(Error::too_short("page header", PAGE_HEADER_SIZE, data.len()));
    }
    check_magic("page header", data, 4)?;
    Ok(PageHeader {
        total_length: get_u32(data, 0),
        page_type: get_u32(data, 12),
        sheet: data[40],
        side: data[41],
    })
}

/// Paper is present iff the no-paper bit of the scan status is clear.
pub fn has_paper(scan_status: u32) -> bool {
    scan_status & status::NO_PAPER == 0
}

/// Decode a GET STATUS response into ADF flags and the error code.
pub fn parse_adf_status(data: &[u8]) -> Result<AdfStatus> {
    if data.len() < status::ERROR_CODE_OFFSET + 2 {
        return Err(Error::too_short(
            "status response",
            status::ERROR_CODE_OFFSET + 2,
            data.len(),
        ));
    }
    let scan_status = get_u32(data, status::SCAN_STATUS_OFFSET);
    Ok(AdfStatus {
        has_paper: has_paper(scan_status),
        cover_open: scan_status & status::COVER_OPEN != 0,
        jam: scan_status & status::PAPER_JAM != 0,
        error_code: get_u16(data, status::ERROR_CODE_OFFSET),
    })
}

/// Extract the status word from a WAIT FOR SCAN response.
/// 0 means a scan has started (or the next sheet is ready).
pub fn parse_wait_status(data: &[u8]) -> Result<u32> {
    if data.len() < status::WAIT_STATUS_OFFSET + 4 {
        return Err(Error::too_short(
            "wait response",
            status::WAIT_STATUS_OFFSET + 4,
            data.len(),
        ));
    }
    Ok(get_u32(data, status::WAIT_STATUS_OFFSET))
}
