//! Session token generation
//!
//! The client chooses an 8-byte token at startup and threads it through
//! every packet of the session, from discovery to session end.

use std::fmt;

use rand::RngCore;
use tracing::debug;

/// An 8-byte session token: 6 random bytes followed by two zero bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SessionToken([u8; 8]);

impl SessionToken {
    /// Generate a fresh token from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut token = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut token[..6]);
        let token = Self(token);
        debug!(token = %token, "generated session token");
        token
    }

    /// Build a token from raw bytes (fixtures and tests).
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_generate_trailing_zeros() {
        let token = SessionToken::generate();
        assert_eq!(token.as_bytes()[6], 0);
        assert_eq!(token.as_bytes()[7], 0);
    }

    #[test]
    fn test_display_hex() {
        let token = SessionToken::from_bytes([0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0, 0]);
        assert_eq!(token.to_string(), "0102030405060000");
    }
}
