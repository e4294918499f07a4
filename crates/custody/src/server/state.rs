//! Shared application state injected into every Axum handler.

use crate::store::CustodyRepository;

/// Application state shared across all request handlers.
///
/// Cheaply cloneable: the repository holds only `Arc`-backed handles, so Axum
/// can clone the state per request without copying records or key material.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Sealing repository over the record store.
    pub repo: CustodyRepository,
}

impl AppState {
    /// Create a new [`AppState`] around `repo`.
    pub fn new(repo: CustodyRepository) -> Self {
        Self { repo }
    }
}
