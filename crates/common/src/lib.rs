//! Field codec, stored records, protocol definitions, and errors shared across
//! `custody-vault` crates.

pub mod crypto;
pub mod error;
pub mod model;
pub mod protocol;
pub mod records;

pub use crypto::FieldCodec;
pub use error::ServiceError;
