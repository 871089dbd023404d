//! Worker status and result reports.
//!
//! Workers are unauthenticated and address jobs by `(owner_id, stored_name)`,
//! the two trailing segments of the retrieval link they were handed.

use axum::extract::{Multipart, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use cloudrender_core::envelope::JobKey;
use cloudrender_core::types::OwnerId;
use serde::Serialize;

use crate::engine::reconciliation;
use crate::error::AppResult;
use crate::handlers::multipart::UploadForm;
use crate::response::Reply;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ResultRecorded {
    pub download_link: String,
}

/// PUT /{owner_id}/blend/update/{stored_name}/{status}
///
/// `status` is a vocabulary name with spaces written as `-`
/// (`in-progress`). Unknown names are 400, unknown jobs 404.
pub async fn update_status(
    State(state): State<AppState>,
    Path((owner_id, stored_name, status)): Path<(OwnerId, String, String)>,
) -> AppResult<impl IntoResponse> {
    let key = JobKey {
        owner_id,
        stored_name,
    };
    reconciliation::apply_status_report(&state, &key, &status).await?;
    Ok(Json(Reply::done()))
}

/// POST|PUT /{owner_id}/image/upload/{stored_name}
///
/// Completion report: multipart `uploadfile` holding the rendered result.
/// Marks the job `success` and records the result's download link.
pub async fn upload_result(
    State(state): State<AppState>,
    Path((owner_id, stored_name)): Path<(OwnerId, String)>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file()?;

    let key = JobKey {
        owner_id,
        stored_name,
    };
    let download_link =
        reconciliation::apply_completion(&state, &key, &file.file_name, &mut &file.data[..])
            .await?;

    Ok(Json(Reply::ok(ResultRecorded { download_link })))
}
