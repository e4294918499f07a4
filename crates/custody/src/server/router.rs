//! Axum router construction.

use std::time::Duration;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, state::AppState};

/// Per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the application [`Router`] with all routes and middleware attached.
///
/// Every request is traced, bounded by [`REQUEST_TIMEOUT`], and compressed
/// when the client accepts it.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/kits", get(handlers::list_kits).post(handlers::create_kit))
        .route("/kits/:code", get(handlers::get_kit))
        .route("/kits/:code/serial-number", put(handlers::set_kit_serial))
        .route("/kits/:code/items", get(handlers::list_kit_items))
        .route("/items", get(handlers::list_items).post(handlers::create_item))
        .route(
            "/items/:id",
            get(handlers::get_item)
                .patch(handlers::update_item)
                .delete(handlers::delete_item),
        )
        .route("/items/:id/kit", put(handlers::assign_item))
        .route("/items/:id/unassign", post(handlers::unassign_item))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}
