//! SCSI sense data decoding
//!
//! REQUEST SENSE responses carry the sense block at offset 40. The
//! scanner reports its conditions (jam, cover open, multi-feed) as
//! MEDIUM ERROR with vendor ASC 0x80; the ASCQ selects the condition.
//! ASCQ 0x03 is "scan complete" and is not an error.

use airscap_types::ScanError;

use crate::consts::sense;

/// Decode a REQUEST SENSE response into a scanner error, if any.
///
/// Returns `None` for NO SENSE, for the scan-complete condition, and
/// for responses too short to carry sense data.
pub fn parse_sense_error(resp: &[u8]) -> Option<ScanError> {
    if resp.len() < sense::DATA_OFFSET + 14 {
        return None;
    }
    let data = &resp[sense::DATA_OFFSET..];
    let key = data[2] & 0x0F;
    let asc = data[12];
    let ascq = data[13];

    match key {
        sense::KEY_NO_SENSE => None,
        sense::KEY_MEDIUM_ERROR if asc == sense::VENDOR_ASC => match ascq {
            sense::ASCQ_PAPER_JAM => Some(ScanError::paper_jam()),
            sense::ASCQ_COVER_OPEN => Some(ScanError::cover_open()),
            sense::ASCQ_MULTI_FEED => Some(ScanError::multi_feed()),
            sense::ASCQ_SCAN_COMPLETE => None,
            _ => Some(ScanError::generic(format!(
                "scanner medium error: ASC=0x{asc:02X} ASCQ=0x{ascq:02X}"
            ))),
        },
        _ => Some(ScanError::generic(format!(
            "scanner sense error: key=0x{key:02X} ASC=0x{asc:02X} ASCQ=0x{ascq:02X}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airscap_types::ScanErrorKind;
    use pretty_assertions::assert_eq;

    fn sense_response(key: u8, asc: u8, ascq: u8) -> Vec<u8> {
        let mut resp = vec![0u8; sense::DATA_OFFSET + 14];
        resp[sense::DATA_OFFSET + 2] = key;
        resp[sense::DATA_OFFSET + 12] = asc;
        resp[sense::DATA_OFFSET + 13] = ascq;
        resp
    }

    /// 58-byte REQUEST SENSE response from scansnap-scan.pcapng:
    /// NO SENSE: page read back cleanly.
    fn pcap_sense_no_error() -> Vec<u8> {
        vec![
            0x00, 0x00, 0x00, 0x3a, 0x56, 0x45, 0x4e, 0x53, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xf0, 0x00,
            0x60, 0x00, 0x03, 0x6a, 0x19, 0x0a, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ]
    }

    /// MEDIUM ERROR with ASC 0x80 / ASCQ 0x03: scan complete, not an error.
    fn pcap_sense_scan_complete() -> Vec<u8> {
        vec![
            0x00, 0x00, 0x00, 0x3a, 0x56, 0x45, 0x4e, 0x53, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xf0, 0x00,
            0x03, 0x00, 0x00, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x00, 0x80, 0x03, 0x00, 0x00,
            0x00, 0x00,
        ]
    }

    /// ILLEGAL REQUEST (key 0x05) from scan-2paper-second-failed.pcapng.
    fn pcap_sense_illegal_request() -> Vec<u8> {
        vec![
            0x00, 0x00, 0x00, 0x3a, 0x56, 0x45, 0x4e, 0x53, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xf0, 0x00,
            0x05, 0x00, 0x00, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x00, 0x24, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ]
    }

    #[test]
    fn test_sense_table() {
        let cases: &[(u8, u8, u8, Option<ScanErrorKind>)] = &[
            (sense::KEY_NO_SENSE, 0, 0, None),
            (sense::KEY_NOT_READY, 0, 0, Some(ScanErrorKind::Generic)),
            (
                sense::KEY_MEDIUM_ERROR,
                sense::VENDOR_ASC,
                sense::ASCQ_PAPER_JAM,
                Some(ScanErrorKind::PaperJam),
            ),
            (
                sense::KEY_MEDIUM_ERROR,
                sense::VENDOR_ASC,
                sense::ASCQ_COVER_OPEN,
                Some(ScanErrorKind::CoverOpen),
            ),
            (
                sense::KEY_MEDIUM_ERROR,
                sense::VENDOR_ASC,
                sense::ASCQ_MULTI_FEED,
                Some(ScanErrorKind::MultiFeed),
            ),
            (sense::KEY_MEDIUM_ERROR, sense::VENDOR_ASC, sense::ASCQ_SCAN_COMPLETE, None),
            (sense::KEY_MEDIUM_ERROR, 0x40, 0x01, Some(ScanErrorKind::Generic)),
            (0x05, 0, 0, Some(ScanErrorKind::Generic)),
        ];
        for &(key, asc, ascq, want) in cases {
            let got = parse_sense_error(&sense_response(key, asc, ascq));
            assert_eq!(
                got.map(|e| e.kind),
                want,
                "key=0x{key:02X} asc=0x{asc:02X} ascq=0x{ascq:02X}"
            );
        }
    }

    #[test]
    fn test_sense_key_high_nibble_masked() {
        // Sense byte 2 carries flags in the high nibble; only the low
        // nibble is the key.
        let resp = sense_response(0xF0 | sense::KEY_NO_SENSE, 0, 0);
        assert_eq!(parse_sense_error(&resp), None);
    }

    #[test]
    fn test_sense_too_short() {
        let resp = vec![0u8; sense::DATA_OFFSET + 13];
        assert_eq!(parse_sense_error(&resp), None);
    }

    #[test]
    fn test_pcap_no_error() {
        assert_eq!(parse_sense_error(&pcap_sense_no_error()), None);
    }

    #[test]
    fn test_pcap_scan_complete() {
        assert_eq!(parse_sense_error(&pcap_sense_scan_complete()), None);
    }

    #[test]
    fn test_pcap_illegal_request() {
        let err = parse_sense_error(&pcap_sense_illegal_request()).unwrap();
        assert_eq!(err.kind, ScanErrorKind::Generic);
    }
}
