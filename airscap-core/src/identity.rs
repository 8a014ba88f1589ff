//! Pairing identity derivation
//!
//! The scanner authenticates clients with a string derived from its
//! password and a fixed key:
//!
//! ```text
//! identity = concat(decimal(password[i] + KEY[i] + 11)) for each i
//! ```
//!
//! The default password is the last four characters of the scanner's
//! serial number.

use crate::error::{Error, Result};

const IDENTITY_KEY: &[u8] = b"pFusCANsNapFiPfu";
const IDENTITY_SHIFT: u32 = 11;

/// Derive the pairing identity string from a password.
///
/// Passwords longer than the 16-byte key are rejected.
///
/// # Examples
///
/// ```
/// use airscap_core::identity::compute_identity;
///
/// assert_eq!(compute_identity("0700").unwrap(), "171136176174");
/// ```
pub fn compute_identity(password: &str) -> Result<String> {
    if password.len() > IDENTITY_KEY.len() {
        return Err(Error::PasswordTooLong {
            max: IDENTITY_KEY.len(),
            actual: password.len(),
        });
    }
    let mut identity = String::new();
    for (i, c) in password.bytes().enumerate() {
        let v = u32::from(c) + u32::from(IDENTITY_KEY[i]) + IDENTITY_SHIFT;
        identity.push_str(&v.to_string());
    }
    Ok(identity)
}

/// Derive the default password from a scanner serial number: trim
/// trailing spaces and NUL bytes, then take the last four characters.
///
/// # Examples
///
/// ```
/// use airscap_core::identity::password_from_serial;
///
/// assert_eq!(password_from_serial("iX500-AK6ABB0700"), "0700");
/// ```
pub fn password_from_serial(serial: &str) -> String {
    let trimmed = serial.trim_end_matches(|c| c == ' ' || c == '\0');
    let chars: Vec<char> = trimmed.chars().collect();
    let start = chars.len().saturating_sub(4);
    chars[start..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compute_identity_known_value() {
        assert_eq!(compute_identity("0700").unwrap(), "171136176174");
    }

    #[test]
    fn test_compute_identity_empty() {
        assert_eq!(compute_identity("").unwrap(), "");
    }

    #[test]
    fn test_compute_identity_max_length() {
        assert!(compute_identity("abcdefghijklmnop").is_ok());
    }

    #[test]
    fn test_compute_identity_too_long() {
        let err = compute_identity("abcdefghijklmnopq").unwrap_err();
        assert!(matches!(err, Error::PasswordTooLong { max: 16, actual: 17 }));
    }

    #[test]
    fn test_password_from_serial() {
        assert_eq!(password_from_serial("iX500-AK6ABB0700"), "0700");
    }

    #[test]
    fn test_password_from_serial_padded() {
        assert_eq!(password_from_serial("iX500-AK6ABB0700  \0\0"), "0700");
    }

    #[test]
    fn test_password_from_serial_short() {
        assert_eq!(password_from_serial("ab"), "ab");
        assert_eq!(password_from_serial(""), "");
    }
}
