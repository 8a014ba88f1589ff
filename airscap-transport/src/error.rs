//! Transport errors

use std::io;

use airscap_types::ScanError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("connection timeout")]
    ConnectTimeout,

    #[error("{op} timed out")]
    Timeout { op: &'static str },

    #[error("discovery timed out")]
    DiscoveryTimeout,

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid response length: {0}")]
    InvalidLength(u32),

    #[error("control channel returned status 0x{0:08X}")]
    ControlStatus(u32),

    #[error("protocol error: {0}")]
    Protocol(#[from] airscap_core::Error),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// The scanner-level error carried by this error, if any.
    pub fn scan_error(&self) -> Option<&ScanError> {
        match self {
            Self::Scan(e) => Some(e),
            _ => None,
        }
    }
}
