//! Worker-facing routes.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{dispatch, files, reports};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/request", get(dispatch::request_job))
        .route(
            "/{owner_id}/blend/update/{stored_name}/{status}",
            put(reports::update_status),
        )
        .route(
            "/{owner_id}/image/upload/{stored_name}",
            post(reports::upload_result).put(reports::upload_result),
        )
        .route("/{owner_id}/blend/download/{file}", get(files::download_input))
        .route("/{owner_id}/image/download/{file}", get(files::download_result))
}
