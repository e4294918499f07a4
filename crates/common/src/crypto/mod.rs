//! Field-level encryption of sensitive identifiers.
//!
//! This module is free of storage and HTTP dependencies. The persistence layer
//! calls [`FieldCodec::encode`] before writing a sensitive field and
//! [`FieldCodec::decode`] after reading one.
//!
//! # Token format
//!
//! ```text
//! v1.<base64url-no-pad(nonce)>.<base64url-no-pad(ciphertext+tag)>
//! ```
//!
//! The `v1` prefix leaves room for a future algorithm or key-version change
//! without breaking existing tokens.
//!
//! # Key loss
//!
//! There is no recovery path. Every value sealed under a lost key is gone.

pub mod cipher;
pub mod key;

pub use cipher::{DecryptError, EncryptError, FieldCodec, SealedValue};
pub use key::{ConfigError, EncryptionKey, KeyFingerprint, KEY_LEN};
