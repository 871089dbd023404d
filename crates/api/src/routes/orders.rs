//! Client order routes. All endpoints require authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::orders;
use crate::state::AppState;

/// ```text
/// POST   /send                -> send_order
/// GET    /orders              -> list_orders
/// GET    /orders/{id}         -> get_order
/// POST   /orders/{id}/delete  -> delete_order
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send", post(orders::send_order))
        .route("/orders", get(orders::list_orders))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/delete", post(orders::delete_order))
}
