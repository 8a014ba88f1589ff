//! # airscap-transport
//!
//! Network plumbing for the AirScap ScanSnap bridge:
//! - UDP scanner discovery and session heartbeat
//! - TCP control channel (pairing, status, release)
//! - TCP data channel (device identity, capabilities, scan sessions)
//! - The scan session state machine with lazy page iteration

pub mod control;
pub mod data;
pub mod discovery;
pub mod error;
pub mod heartbeat;
mod io;
pub mod session;

pub use control::ControlChannel;
pub use data::DataChannel;
pub use discovery::{find_scanner, local_ip, DiscoveryOptions};
pub use error::{Error, Result};
pub use heartbeat::Heartbeat;
pub use session::ScanSession;

use std::time::Duration;

/// TCP connect deadline for both scanner channels.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for a typical request/response exchange.
pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for one 256 KiB page chunk.
pub const CHUNK_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for the first wait-for-scan, long enough for a physical
/// button press.
pub const WAIT_FOR_SCAN_TIMEOUT: Duration = Duration::from_secs(120);

/// Deadline for the wait-for-scan between sheets.
pub const NEXT_SHEET_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for the end-scan exchange during session teardown.
pub const END_SCAN_TIMEOUT: Duration = Duration::from_secs(5);
