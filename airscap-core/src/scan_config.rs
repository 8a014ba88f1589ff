//! Scan configuration frame (0xD4) and bleed-through tone curve (0xDB)
//!
//! The D4 payload is the most intricate frame of the protocol: a
//! 28-byte parameter header followed by an 80-byte config block, or a
//! 128-byte block when color mode and quality are both auto and duplex
//! is on (the scanner then takes a separate back-side parameter set).
//! Several constant bytes (+9, +12, +31, +50, +54..+56) have unknown
//! meaning and are reproduced verbatim from captures.

use bytes::Bytes;

use airscap_types::{ColorMode, PaperDimension, PaperSize, Quality, ScanConfig};

use crate::consts::{cdb, scsi};
use crate::frame::Frame;
use crate::packets::data_request;
use crate::token::SessionToken;
use crate::MAGIC;

/// Build the 0xD4 SET SCAN CONFIG frame.
///
/// Total size is 64 + 0x50 = 144 bytes, or 64 + 0x80 = 192 bytes for
/// full-auto duplex.
pub fn write_scan_config(token: &SessionToken, cfg: &ScanConfig) -> Bytes {
    let is_bw = cfg.color_mode == ColorMode::Bw;
    let is_gray = cfg.color_mode == ColorMode::Gray;
    let is_auto_color = cfg.color_mode == ColorMode::Auto;
    let is_auto_quality = cfg.quality == Quality::Auto;
    let full_auto = is_auto_color && is_auto_quality;

    let dpi = cfg.quality.dpi();
    let mut dim = cfg.paper_size.dimensions();
    if cfg.paper_width != 0 && cfg.paper_height != 0 {
        dim = PaperDimension { width: cfg.paper_width, height: cfg.paper_height };
    }

    let config_size: u32 = if cfg.duplex && full_auto { 0x80 } else { 0x50 };
    let total = 64 + config_size as usize;
    let mut p = Frame::new(total);

    // Data channel header [0:36]
    p.put_u32(0, total as u32);
    p.put_bytes(4, &MAGIC);
    p.put_u32(8, 1); // direction = client→scanner
    p.put_bytes(16, token.as_bytes());
    p.put_u32(32, cdb::LEN6);

    // Parameter header [36:64]
    p.put_u32(40, config_size);
    p.put_u8(48, scsi::WRITE_SCAN_CONFIG);
    p.put_u8(52, config_size as u8);

    // Config block at offset 64
    let c = 64;

    // +1: simplex/duplex
    p.put_u8(c + 1, if cfg.duplex { 0x03 } else { 0x01 });
    // +2, +3, +5: always 0x01
    p.put_u8(c + 2, 0x01);
    p.put_u8(c + 3, 0x01);
    p.put_u8(c + 5, 0x01);
    // +4, +6: multi-feed detection
    p.put_u8(c + 4, if cfg.multi_feed { 0xD0 } else { 0x80 });
    p.put_u8(c + 6, if cfg.multi_feed { 0xC1 } else { 0xC0 });
    // +7: auto color+quality
    p.put_u8(c + 7, if full_auto { 0xC1 } else { 0x80 });
    // +8: blank page removal
    p.put_u8(c + 8, if cfg.blank_page_removal { 0xE0 } else { 0x80 });
    // +9: constant
    p.put_u8(c + 9, 0xC8);
    // +10: auto quality
    p.put_u8(c + 10, if is_auto_quality { 0xA0 } else { 0x80 });
    // +11: bleed-through reduction
    p.put_u8(c + 11, if cfg.bleed_through { 0xC0 } else { 0x80 });
    // +12: constant
    p.put_u8(c + 12, 0x80);

    // Front side parameters
    p.put_u8(c + 31, 0x30);
    p.put_u8(c + 33, if is_bw { 0x40 } else { 0x10 });
    p.put_u16(c + 34, dpi);
    p.put_u16(c + 36, dpi);

    // +38..40: color encoding triple
    let enc_tail = if cfg.paper_size == PaperSize::Postcard { 0x09 } else { 0x0B };
    if is_gray {
        p.put_u8(c + 38, 0x02);
        p.put_u8(c + 39, 0x82);
        p.put_u8(c + 40, enc_tail);
    } else if is_bw {
        p.put_u8(c + 38, 0x00);
        p.put_u8(c + 39, 0x03);
        p.put_u8(c + 40, 0x00);
    } else {
        p.put_u8(c + 38, 0x05);
        p.put_u8(c + 39, 0x82);
        p.put_u8(c + 40, enc_tail);
    }

    // +44, +48: paper size (1/1200 inch; 0 = auto)
    p.put_u16(c + 44, dim.width);
    p.put_u16(c + 48, dim.height);
    // +50: constant
    p.put_u8(c + 50, 0x04);
    // +54..56: constants
    p.put_u8(c + 54, 0x01);
    p.put_u8(c + 55, 0x01);
    p.put_u8(c + 56, 0x01);
    if is_bw {
        p.put_u8(c + 57, 0x01);
        // +60: wire density = 6 + requested density in [-5, +5]
        p.put_u8(c + 60, (6 + i32::from(cfg.bw_density)) as u8);
    }

    // Back side parameters, present only in the full-auto duplex block
    if config_size == 0x80 {
        let bc = c + 80;
        p.put_u8(bc, 0x01);
        p.put_u8(bc + 1, 0x10);
        p.put_u16(bc + 2, dpi);
        p.put_u16(bc + 4, dpi);
        p.put_u8(bc + 6, 0x02);
        p.put_u8(bc + 7, 0x82);
        p.put_u8(bc + 8, 0x0B);
        p.put_u16(bc + 12, dim.width);
        p.put_u16(bc + 16, dim.height);
        p.put_u8(bc + 18, 0x04);
        p.put_u8(bc + 22, 0x01);
        p.put_u8(bc + 23, 0x01);
        p.put_u8(bc + 24, 0x01);
    }

    p.freeze()
}

/// The 256-byte tone curve for bleed-through reduction.
///
/// Captured from ScanSnap Home: identity up to 0x83, then a boosted
/// highlight ramp clipping to 0xFF near input 0xE5.
const BLEED_THROUGH_LUT: [u8; 256] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f,
    0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2a, 0x2b, 0x2c, 0x2d, 0x2e, 0x2f,
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3a, 0x3b, 0x3c, 0x3d, 0x3e, 0x3f,
    0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4a, 0x4b, 0x4c, 0x4d, 0x4e, 0x4f,
    0x50, 0x51, 0x52, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5a, 0x5b, 0x5c, 0x5d, 0x5e, 0x5f,
    0x60, 0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6a, 0x6b, 0x6c, 0x6d, 0x6e, 0x6f,
    0x70, 0x71, 0x72, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7a, 0x7b, 0x7c, 0x7d, 0x7e, 0x7f,
    0x80, 0x81, 0x82, 0x83, 0x85, 0x86, 0x87, 0x88, 0x8a, 0x8b, 0x8c, 0x8d, 0x8f, 0x90, 0x91, 0x92,
    0x93, 0x95, 0x96, 0x97, 0x98, 0x9a, 0x9b, 0x9c, 0x9d, 0x9f, 0xa0, 0xa1, 0xa2, 0xa3, 0xa5, 0xa6,
    0xa7, 0xa8, 0xaa, 0xab, 0xac, 0xad, 0xaf, 0xb0, 0xb1, 0xb2, 0xb4, 0xb5, 0xb6, 0xb7, 0xb8, 0xba,
    0xbb, 0xbc, 0xbd, 0xbf, 0xc0, 0xc1, 0xc2, 0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xca, 0xcb, 0xcc, 0xcd,
    0xcf, 0xd0, 0xd1, 0xd2, 0xd4, 0xd5, 0xd6, 0xd7, 0xd9, 0xda, 0xdb, 0xdc, 0xdd, 0xdf, 0xe0, 0xe1,
    0xe2, 0xe4, 0xe5, 0xe6, 0xe7, 0xe9, 0xea, 0xeb, 0xec, 0xed, 0xef, 0xf0, 0xf1, 0xf2, 0xf4, 0xf5,
    0xf6, 0xf7, 0xf9, 0xfa, 0xfb, 0xfc, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
];

/// Build the 0xDB WRITE TONE CURVE frame: a 10-byte tone-curve header
/// followed by the fixed 256-byte LUT.
pub fn write_tone_curve(token: &SessionToken) -> Bytes {
    // 28-byte param header + 10-byte tone curve header + 256-byte LUT
    let mut p = Frame::new(294);
    p.put_u32(4, 0x0000_010A); // input param length = 266
    p.put_u8(12, scsi::WRITE_TONE_CURVE);
    p.put_u8(13, 0x85);
    p.put_u32(16, 0x0001_0A00);
    // Tone curve header at offset 28
    p.put_bytes(28, &[0x00, 0x00, 0x10, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00]);
    p.put_bytes(38, &BLEED_THROUGH_LUT);
    data_request(token, cdb::LEN8, &p.freeze())
}
