//! Error types for airscap-core

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wire codec errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Packet is too short to be valid
    #[error("{what}: expected at least {expected} bytes, got {actual}")]
    TooShort {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Magic bytes do not match "VENS"
    #[error("{what}: bad magic")]
    BadMagic { what: &'static str },

    /// Unexpected command word in an otherwise valid frame
    #[error("{what}: unexpected command 0x{command:X}")]
    UnexpectedCommand { what: &'static str, command: u32 },

    /// Password exceeds the identity key length
    #[error("password too long: max {max} chars, got {actual}")]
    PasswordTooLong { max: usize, actual: usize },
}

impl Error {
    pub(crate) fn too_short(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::TooShort { what, expected, actual }
    }

    pub(crate) fn bad_magic(what: &'static str) -> Self {
        Self::BadMagic { what }
    }
}
