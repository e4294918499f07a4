//! Encryption key parsing, validation, and fingerprinting.

use base64::{
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD},
    Engine as _,
};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Number of SHA-256 bytes kept in a [`KeyFingerprint`].
const FINGERPRINT_LEN: usize = 8;

/// Errors raised while turning configured key material into a usable key.
///
/// Any of these at startup is fatal: the process must not serve requests
/// that would touch an encrypted field.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No key material was configured, or it was blank.
    #[error("encryption key is missing or empty")]
    MissingKey,

    /// The key material is not valid base64 in any accepted alphabet.
    #[error("encryption key is not valid base64")]
    InvalidEncoding,

    /// The key material decoded to the wrong number of bytes.
    #[error("encryption key must decode to {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),
}

/// A validated 256-bit symmetric key.
///
/// The bytes are overwritten with zeroes on drop and never printed.
pub struct EncryptionKey(Box<[u8; KEY_LEN]>);

impl EncryptionKey {
    /// Parse base64 key material as supplied through configuration.
    ///
    /// Standard and URL-safe alphabets are accepted, with or without padding.
    /// Leading and trailing whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] for blank input,
    /// [`ConfigError::InvalidEncoding`] if no alphabet decodes it, and
    /// [`ConfigError::InvalidKeyLength`] if it does not decode to [`KEY_LEN`] bytes.
    pub fn parse(material: &str) -> Result<Self, ConfigError> {
        let material = material.trim();
        if material.is_empty() {
            return Err(ConfigError::MissingKey);
        }
        let mut decoded = decode_material(material).ok_or(ConfigError::InvalidEncoding)?;
        let key = Self::from_bytes(&decoded);
        decoded.iter_mut().for_each(|b| *b = 0);
        key
    }

    /// Build a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidKeyLength`] if `bytes` is not [`KEY_LEN`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() != KEY_LEN {
            return Err(ConfigError::InvalidKeyLength(bytes.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Short, non-reversible identifier for this key, safe to log.
    pub fn fingerprint(&self) -> KeyFingerprint {
        let digest = Sha256::digest(&self.0[..]);
        let mut out = [0u8; FINGERPRINT_LEN];
        out.copy_from_slice(&digest[..FINGERPRINT_LEN]);
        KeyFingerprint(out)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

fn decode_material(material: &str) -> Option<Vec<u8>> {
    [STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(material).ok())
}

/// First eight bytes of the SHA-256 digest of a key, rendered as hex.
///
/// Lets operators confirm which key a process loaded without exposing it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyFingerprint([u8; FINGERPRINT_LEN]);

impl std::fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for KeyFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyFingerprint({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    #[test]
    fn parses_standard_base64() {
        let key = EncryptionKey::parse(&material(&[0x42; KEY_LEN])).unwrap();
        assert_eq!(key.as_bytes(), &[0x42; KEY_LEN]);
    }

    #[test]
    fn parses_url_safe_unpadded_and_trims() {
        let bytes = [0xFBu8; KEY_LEN];
        let encoded = format!("  {}\n", URL_SAFE_NO_PAD.encode(bytes));
        let key = EncryptionKey::parse(&encoded).unwrap();
        assert_eq!(key.as_bytes(), &bytes);
    }

    #[test]
    fn blank_material_is_missing() {
        assert_eq!(EncryptionKey::parse("").unwrap_err(), ConfigError::MissingKey);
        assert_eq!(EncryptionKey::parse("   ").unwrap_err(), ConfigError::MissingKey);
    }

    #[test]
    fn non_base64_rejected() {
        assert_eq!(
            EncryptionKey::parse("not a key!").unwrap_err(),
            ConfigError::InvalidEncoding
        );
    }

    #[test]
    fn wrong_length_rejected() {
        assert_eq!(
            EncryptionKey::parse(&material(&[1u8; 16])).unwrap_err(),
            ConfigError::InvalidKeyLength(16)
        );
        assert_eq!(
            EncryptionKey::parse(&material(&[1u8; 33])).unwrap_err(),
            ConfigError::InvalidKeyLength(33)
        );
    }

    #[test]
    fn fingerprint_is_stable_and_key_specific() {
        let a = EncryptionKey::from_bytes(&[1u8; KEY_LEN]).unwrap();
        let a2 = EncryptionKey::from_bytes(&[1u8; KEY_LEN]).unwrap();
        let b = EncryptionKey::from_bytes(&[2u8; KEY_LEN]).unwrap();
        assert_eq!(a.fingerprint(), a2.fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().to_string().len(), FINGERPRINT_LEN * 2);
    }

    #[test]
    fn key_redacted_in_debug() {
        let key = EncryptionKey::from_bytes(&[0xAB; KEY_LEN]).unwrap();
        let printed = format!("{key:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("171"));
    }
}
