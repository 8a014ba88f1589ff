//! # airscap-core
//!
//! Wire codec for the ScanSnap iX500's proprietary "VENS" protocol.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame building and parsing for every VENS packet
//! - SCSI CDB layouts carried by the data channel
//! - Sense-data and status-bitmask decoding
//! - Pairing identity derivation
//! - Session token generation

pub mod consts;
pub mod error;
mod frame;
pub mod identity;
pub mod packets;
pub mod scan_config;
pub mod sense;
pub mod token;

pub use error::{Error, Result};
pub use token::SessionToken;

/// The four-byte magic identifying every VENS frame.
pub const MAGIC: [u8; 4] = *b"VENS";

/// Magic of the ssNR companion discovery packet.
pub const MAGIC_SSNR: [u8; 4] = *b"ssNR";
