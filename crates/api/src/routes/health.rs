use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `"ok"` when every dependency answers, `"degraded"` otherwise.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub db_healthy: bool,
    pub queue_healthy: bool,
}

/// GET /health -- returns service, database and queue health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (db, queue) = tokio::join!(
        cloudrender_db::health_check(&state.pool),
        state.queue.ping()
    );
    let db_healthy = db.is_ok();
    let queue_healthy = queue.is_ok();

    let status = if db_healthy && queue_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        queue_healthy,
    })
}

/// Mount health check routes at the root.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
