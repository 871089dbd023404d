//! Client handlers for submitting and inspecting orders.
//!
//! Every endpoint is scoped to the caller resolved by [`AuthUser`].

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cloudrender_core::error::CoreError;
use cloudrender_core::types::{DbId, StatusId};
use cloudrender_db::models::job::Job;
use cloudrender_db::repositories::JobRepo;
use serde::Serialize;

use crate::engine::submission::{self, SubmitJob};
use crate::error::{AppError, AppResult};
use crate::handlers::multipart::UploadForm;
use crate::middleware::auth::AuthUser;
use crate::response::Reply;
use crate::state::AppState;

/// `date` format in order listings (`dd-mm-yyyy`).
const DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Debug, Serialize)]
pub struct SentOrder {
    pub id: DbId,
    pub stored_name: String,
}

#[derive(Debug, Serialize)]
pub struct OrderItem {
    pub id: DbId,
    pub filename: String,
    pub date: String,
    pub status: String,
    #[serde(rename = "downloadLink", skip_serializing_if = "Option::is_none")]
    pub download_link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderList {
    pub orders: Vec<OrderItem>,
}

#[derive(Debug, Serialize)]
pub struct OrderStatus {
    pub order_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_link: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a non-deleted job by id and verify the caller owns it.
async fn find_and_authorize(state: &AppState, job_id: DbId, auth: &AuthUser) -> AppResult<Job> {
    let job = JobRepo::find_by_id(&state.pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;

    if job.owner_id != auth.owner_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot access another owner's order".into(),
        )));
    }

    Ok(job)
}

fn status_name(state: &AppState, code: StatusId) -> AppResult<String> {
    state
        .vocabulary
        .name_of(code)
        .map(str::to_string)
        .ok_or_else(|| AppError::Core(CoreError::Internal(format!("Unknown status code {code}"))))
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /send
///
/// Multipart form with `format`, `resolution` and `uploadfile`. Returns 201
/// once the job row exists; the envelope push is best-effort.
pub async fn send_order(
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = UploadForm::read(multipart).await?;
    let format = form.take_field("format")?;
    let resolution = form.take_field("resolution")?;
    let file = form.take_file()?;

    let input = SubmitJob {
        owner_id: auth.owner_id,
        format,
        resolution,
        original_name: file.file_name,
    };
    let submitted = submission::submit(&state, input, &mut &file.data[..]).await?;

    Ok((
        StatusCode::CREATED,
        Json(Reply::ok(SentOrder {
            id: submitted.job.id,
            stored_name: submitted.job.stored_name,
        })),
    ))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /orders
///
/// The caller's non-deleted orders, newest first.
pub async fn list_orders(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let jobs = JobRepo::list_by_owner(&state.pool, auth.owner_id).await?;

    let orders = jobs
        .into_iter()
        .map(|job| -> AppResult<OrderItem> {
            Ok(OrderItem {
                id: job.id,
                status: status_name(&state, job.status_id)?,
                date: job.created_at.format(DATE_FORMAT).to_string(),
                filename: job.original_name,
                download_link: job.result_link,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(Reply::ok(OrderList { orders })))
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

/// GET /orders/{id}
pub async fn get_order(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_and_authorize(&state, job_id, &auth).await?;

    Ok(Json(Reply::ok(OrderStatus {
        order_status: status_name(&state, job.status_id)?,
        download_link: job.result_link,
    })))
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// POST /orders/{id}/delete
///
/// Soft delete. The row and its artifacts are kept; the order disappears
/// from the caller's reads.
pub async fn delete_order(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state, job_id, &auth).await?;

    if !JobRepo::soft_delete(&state.pool, job_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }));
    }

    tracing::info!(job_id, owner_id = auth.owner_id, "Order deleted");
    Ok(Json(Reply::done()))
}
