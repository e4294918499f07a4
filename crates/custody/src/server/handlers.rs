//! Axum request handlers for all service endpoints.
//!
//! Responses carry decoded plaintext only. A stored value that fails its
//! integrity check turns into a generic `500 data_unavailable`; the details are
//! logged by the repository.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    ErrorResponse, HealthResponse, ItemFilter, ItemUpdate, KitAssignment, NewItem,
    NewKit, SerialNumberUpdate,
};
use common::ServiceError;
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use super::state::AppState;
use crate::store::StoreError;

/// `GET /health`: liveness check with store counts.
pub async fn health(State(state): State<AppState>) -> Response {
    let store = state.repo.store();
    let snapshot = store.snapshot();
    let body = HealthResponse {
        status: "ok".into(),
        kits: snapshot.kits.len(),
        items: snapshot.items.len(),
        persistent: store.is_persistent(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// `GET /kits`
pub async fn list_kits(State(state): State<AppState>) -> Response {
    respond(StatusCode::OK, state.repo.list_kits().await)
}

/// `POST /kits`: create a kit; the serial number is sealed before storage.
pub async fn create_kit(
    State(state): State<AppState>,
    payload: Result<Json<NewKit>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };
    respond(StatusCode::CREATED, state.repo.create_kit(req).await)
}

/// `GET /kits/:code`
pub async fn get_kit(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    respond(StatusCode::OK, state.repo.get_kit(&code).await)
}

/// `PUT /kits/:code/serial-number`: replace or clear (`null`) the serial.
pub async fn set_kit_serial(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: Result<Json<SerialNumberUpdate>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };
    respond(
        StatusCode::OK,
        state.repo.set_kit_serial(&code, req.serial_number).await,
    )
}

/// `GET /kits/:code/items`
pub async fn list_kit_items(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    respond(StatusCode::OK, state.repo.list_kit_items(&code).await)
}

/// `GET /items?status=&item_type=&assigned=&skip=&limit=`
pub async fn list_items(
    State(state): State<AppState>,
    filter: Result<Query<ItemFilter>, QueryRejection>,
) -> Response {
    let Query(filter) = match filter {
        Ok(q) => q,
        Err(rejection) => {
            return error_response(ServiceError::BadRequest(rejection.body_text()))
        }
    };
    respond(StatusCode::OK, state.repo.list_items(&filter).await)
}

/// `POST /items`
pub async fn create_item(
    State(state): State<AppState>,
    payload: Result<Json<NewItem>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };
    respond(StatusCode::CREATED, state.repo.create_item(req).await)
}

/// `GET /items/:id`
pub async fn get_item(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let Path(id) = match id {
        Ok(p) => p,
        Err(rejection) => return bad_path(rejection),
    };
    respond(StatusCode::OK, state.repo.get_item(id).await)
}

/// `PATCH /items/:id`
pub async fn update_item(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ItemUpdate>, JsonRejection>,
) -> Response {
    let Path(id) = match id {
        Ok(p) => p,
        Err(rejection) => return bad_path(rejection),
    };
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };
    respond(StatusCode::OK, state.repo.update_item(id, req).await)
}

/// `PUT /items/:id/kit`
pub async fn assign_item(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<KitAssignment>, JsonRejection>,
) -> Response {
    let Path(id) = match id {
        Ok(p) => p,
        Err(rejection) => return bad_path(rejection),
    };
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_json(rejection),
    };
    respond(StatusCode::OK, state.repo.assign_item(id, &req.kit_code).await)
}

/// `POST /items/:id/unassign`
pub async fn unassign_item(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let Path(id) = match id {
        Ok(p) => p,
        Err(rejection) => return bad_path(rejection),
    };
    respond(StatusCode::OK, state.repo.unassign_item(id).await)
}

/// `DELETE /items/:id`: refused while the item is in a kit.
pub async fn delete_item(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let Path(id) = match id {
        Ok(p) => p,
        Err(rejection) => return bad_path(rejection),
    };
    match state.repo.delete_item(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn respond<T: Serialize>(status: StatusCode, result: Result<T, StoreError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => error_response(e.into()),
    }
}

fn error_response(err: ServiceError) -> Response {
    if let ServiceError::Internal(detail) = &err {
        error!(error = %detail, "request failed");
    }
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorResponse::new(err.code(), err.public_message());
    (status, Json(body)).into_response()
}

fn bad_json(rejection: JsonRejection) -> Response {
    error_response(ServiceError::BadRequest(rejection.body_text()))
}

fn bad_path(rejection: PathRejection) -> Response {
    error_response(ServiceError::BadRequest(rejection.body_text()))
}
