//! Record storage and the sealing repository in front of it.
//!
//! # Module invariants
//!
//! - Nothing outside [`repository`] touches `serial_number_encrypted`.
//! - [`records::RecordStore`] never sees plaintext; it only holds snapshots of
//!   sealed records.

pub mod records;
pub mod repository;

pub use records::RecordStore;
pub use repository::{CustodyRepository, StoreError};
