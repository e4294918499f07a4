//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.
//! - Translate repository errors into status codes without leaking sealed
//!   tokens or integrity details to callers.

pub mod handlers;
pub mod router;
pub mod state;
