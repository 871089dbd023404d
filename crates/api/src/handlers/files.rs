//! Artifact downloads.

use std::io;
use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use cloudrender_core::error::CoreError;
use cloudrender_core::types::OwnerId;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Stream a file from disk as an attachment.
async fn serve_file(path: &FsPath, entity: &'static str, key: String) -> AppResult<Response> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(AppError::Core(CoreError::NotFoundByKey { entity, key }));
        }
        Err(e) => return Err(AppError::InternalError(e.to_string())),
    };
    let file_size = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .len();

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, file_size.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// GET /{owner_id}/blend/download/{file}
///
/// The input artifact a worker renders; this is the retrieval link target.
pub async fn download_input(
    State(state): State<AppState>,
    Path((owner_id, file)): Path<(OwnerId, String)>,
) -> AppResult<Response> {
    let path = state.store.input_path(owner_id, &file)?;
    serve_file(&path, "InputArtifact", format!("{owner_id}/{file}")).await
}

/// GET /{owner_id}/image/download/{file}
///
/// A rendered result; this is the `result_link` target.
pub async fn download_result(
    State(state): State<AppState>,
    Path((owner_id, file)): Path<(OwnerId, String)>,
) -> AppResult<Response> {
    let path = state.store.output_path(owner_id, &file)?;
    serve_file(&path, "ResultArtifact", format!("{owner_id}/{file}")).await
}
