//! Worker pull endpoint.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::AppResult;
use crate::response::Reply;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Dispatched {
    pub format: String,
    pub resolution: String,
    pub download_link: String,
}

/// GET /request
///
/// Hand the next envelope to the calling worker, priority lane first. Each
/// lane is waited on for at most the configured pop timeout; when both stay
/// empty the reply is `{"status": "Empty"}`, not an error. An envelope that
/// fails to decode is already gone from the queue and is reported as a 500.
pub async fn request_job(State(state): State<AppState>) -> AppResult<Response> {
    let envelope =
        cloudrender_queue::next_envelope(state.queue.as_ref(), state.config.dispatch_pop_timeout)
            .await?;

    let Some(envelope) = envelope else {
        tracing::debug!("Dispatch queues empty");
        return Ok(Json(Reply::empty()).into_response());
    };

    let download_link = envelope.retrieval_link(&state.config.public_base_url)?;

    tracing::info!(
        save_path = %envelope.save_path,
        format = %envelope.format,
        resolution = %envelope.resolution,
        "Job dispatched to worker",
    );

    Ok(Json(Reply::ok(Dispatched {
        format: envelope.format,
        resolution: envelope.resolution,
        download_link,
    }))
    .into_response())
}
