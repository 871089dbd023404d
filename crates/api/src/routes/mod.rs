pub mod health;
pub mod orders;
pub mod worker;

use axum::Router;

use crate::state::AppState;

/// Build the client route tree (mounted under `API_PREFIX`).
///
/// ```text
/// /send                        submit (POST, multipart)
/// /orders                      list own orders
/// /orders/{id}                 order status
/// /orders/{id}/delete          soft delete (POST)
/// ```
pub fn client_routes() -> Router<AppState> {
    orders::router()
}

/// Build the worker route tree (always mounted at the root, unauthenticated).
///
/// ```text
/// /request                                      pull next envelope
/// /{owner_id}/blend/update/{stored_name}/{status}   status report (PUT)
/// /{owner_id}/image/upload/{stored_name}        result upload (POST, PUT)
/// /{owner_id}/blend/download/{file}             input artifact
/// /{owner_id}/image/download/{file}             result artifact
/// ```
pub fn worker_routes() -> Router<AppState> {
    worker::router()
}
