//! High-level error types

use airscap_types::ScanError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("scanner not connected")]
    NotConnected,

    #[error("pairing rejected: wrong password or identity")]
    PairingRejected,

    #[error("invalid scan request: {0}")]
    InvalidRequest(String),

    #[error("codec error: {0}")]
    Core(#[from] airscap_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] airscap_transport::Error),
}

impl Error {
    /// The scanner-level error carried by this error, if any.
    pub fn scan_error(&self) -> Option<&ScanError> {
        match self {
            Self::Transport(e) => e.scan_error(),
            _ => None,
        }
    }
}
