//! AES-256-GCM-SIV sealing and opening of individual string fields.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) is nonce-misuse-resistant.
//! A fresh random nonce is still drawn for every seal, so two seals of the same
//! plaintext never produce the same token.

use std::str::FromStr;

use aes_gcm_siv::{
    aead::{generic_array::GenericArray, Aead, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::key::{ConfigError, EncryptionKey, KeyFingerprint};

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the AES-GCM-SIV authentication tag.
pub const TAG_LEN: usize = 16;

/// Prefix that appears at the start of every token.
pub const VERSION_PREFIX: &str = "v1";

/// Errors produced when opening a token.
///
/// Every variant is an integrity failure for the value concerned. Callers must
/// propagate it; mapping it to an empty or default value loses data silently.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecryptError {
    /// The token does not match the `v1.<nonce>.<ciphertext>` structure.
    #[error("malformed field token")]
    MalformedToken,

    /// The token names a format version this codec does not understand.
    #[error("unsupported field token version: {0}")]
    UnsupportedVersion(String),

    /// The tag did not verify: wrong key, corruption, or tampering.
    #[error("field token failed authentication")]
    AuthenticationFailed,

    /// The authenticated plaintext is not UTF-8.
    #[error("decrypted field is not valid UTF-8")]
    InvalidUtf8,
}

/// AES-GCM-SIV refused to seal a value. Unreachable with a valid key; treat as
/// an environment failure.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("aead encryption failed")]
pub struct EncryptError;

/// A stored ciphertext token.
///
/// Only produced by [`FieldCodec`] or read back from storage. Its `Debug`
/// output never includes the token itself.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealedValue(String);

impl SealedValue {
    /// Wrap a token exactly as it was read from storage.
    pub fn from_storage(token: String) -> Self {
        Self(token)
    }

    /// The token text as it should be written to storage.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SealedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealedValue([SEALED])")
    }
}

/// A parsed token: nonce plus ciphertext-with-tag.
///
/// The string form is `v1.<base64url(nonce)>.<base64url(ciphertext+tag)>`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TokenParts {
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl TokenParts {
    fn to_token(&self) -> String {
        format!(
            "{}.{}.{}",
            VERSION_PREFIX,
            URL_SAFE_NO_PAD.encode(self.nonce),
            URL_SAFE_NO_PAD.encode(&self.ciphertext),
        )
    }
}

impl FromStr for TokenParts {
    type Err = DecryptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.splitn(3, '.').collect();
        if parts.len() != 3 {
            return Err(DecryptError::MalformedToken);
        }
        if parts[0] != VERSION_PREFIX {
            return Err(if is_version_tag(parts[0]) {
                DecryptError::UnsupportedVersion(parts[0].to_owned())
            } else {
                DecryptError::MalformedToken
            });
        }

        let nonce_bytes = URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|_| DecryptError::MalformedToken)?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(DecryptError::MalformedToken);
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&nonce_bytes);

        let ciphertext = URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|_| DecryptError::MalformedToken)?;
        if ciphertext.len() < TAG_LEN {
            return Err(DecryptError::MalformedToken);
        }

        Ok(Self { nonce, ciphertext })
    }
}

fn is_version_tag(s: &str) -> bool {
    s.strip_prefix('v')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Authenticated, non-deterministic codec for sensitive string fields.
///
/// Holds one immutable key for the process lifetime. `Send + Sync` and free of
/// interior mutability, so a single instance is shared behind an `Arc`.
pub struct FieldCodec {
    cipher: Aes256GcmSiv,
    fingerprint: KeyFingerprint,
}

impl FieldCodec {
    /// Validate configured key material and build a codec from it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the material is blank, not base64, or not a
    /// 256-bit key.
    pub fn initialize(key_material: &str) -> Result<Self, ConfigError> {
        let key = EncryptionKey::parse(key_material)?;
        Ok(Self::with_key(&key))
    }

    /// Build a codec from an already validated key.
    pub fn with_key(key: &EncryptionKey) -> Self {
        Self {
            cipher: Aes256GcmSiv::new(GenericArray::from_slice(key.as_bytes())),
            fingerprint: key.fingerprint(),
        }
    }

    /// Fingerprint of the key this codec was built with.
    pub fn fingerprint(&self) -> KeyFingerprint {
        self.fingerprint
    }

    /// Seal an optional plaintext. Absent stays absent.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptError`] on an internal AEAD failure.
    pub fn encode(&self, plaintext: Option<&str>) -> Result<Option<SealedValue>, EncryptError> {
        plaintext.map(|p| self.seal(p)).transpose()
    }

    /// Open an optional token. Absent stays absent.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptError`] if a present token is malformed, fails
    /// authentication, or does not hold UTF-8.
    pub fn decode(&self, token: Option<&SealedValue>) -> Result<Option<String>, DecryptError> {
        token.map(|t| self.open(t)).transpose()
    }

    /// Seal a plaintext string under a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptError`] on an internal AEAD failure.
    pub fn seal(&self, plaintext: &str) -> Result<SealedValue, EncryptError> {
        use aes_gcm_siv::aead::rand_core::RngCore;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| EncryptError)?;

        let parts = TokenParts {
            nonce: nonce_bytes,
            ciphertext,
        };
        Ok(SealedValue(parts.to_token()))
    }

    /// Authenticate and open a token.
    ///
    /// # Errors
    ///
    /// See [`FieldCodec::decode`].
    pub fn open(&self, token: &SealedValue) -> Result<String, DecryptError> {
        let parts: TokenParts = token.as_str().parse()?;
        let nonce = Nonce::from_slice(&parts.nonce);
        let plaintext = self
            .cipher
            .decrypt(nonce, parts.ciphertext.as_ref())
            .map_err(|_| DecryptError::AuthenticationFailed)?;
        String::from_utf8(plaintext).map_err(|_| DecryptError::InvalidUtf8)
    }
}

impl std::fmt::Debug for FieldCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCodec")
            .field("key", &"[REDACTED]")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}
