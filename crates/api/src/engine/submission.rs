//! Job submission.
//!
//! The artifact write, the row insert and the envelope push are three
//! independent resources with no shared transaction:
//!
//! 1. Artifact written under a fresh stored name.
//! 2. Row inserted as `in queue`. On failure the artifact is removed.
//! 3. Envelope pushed on the normal lane. On failure the row stays with
//!    `enqueued_at` unset and the requeue sweep republishes it later.

use chrono::Utc;
use cloudrender_core::envelope::DispatchEnvelope;
use cloudrender_core::naming::file_extension;
use cloudrender_core::render::{validate_format, Resolution};
use cloudrender_core::status::JobState;
use cloudrender_core::types::OwnerId;
use cloudrender_db::models::job::{CreateJob, Job};
use cloudrender_db::repositories::JobRepo;
use cloudrender_queue::{publish, Lane};
use tokio::io::AsyncRead;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// A validated-on-entry submission request.
#[derive(Debug, Clone)]
pub struct SubmitJob {
    pub owner_id: OwnerId,
    pub format: String,
    pub resolution: String,
    pub original_name: String,
}

/// Result of a successful submission.
#[derive(Debug)]
pub struct Submitted {
    pub job: Job,
    /// Whether the envelope reached the queue. `false` leaves the job for the sweep.
    pub enqueued: bool,
}

/// Accept a new job: persist the artifact, create the row, publish the envelope.
pub async fn submit<R>(state: &AppState, input: SubmitJob, artifact: &mut R) -> AppResult<Submitted>
where
    R: AsyncRead + Unpin + ?Sized,
{
    validate_format(&input.format)?;
    input.resolution.parse::<Resolution>()?;
    let extension = file_extension(&input.original_name)?;

    let stored = state
        .store
        .save_input(input.owner_id, Utc::now().timestamp(), &extension, artifact)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to store artifact: {e}")))?;

    let create = CreateJob {
        owner_id: input.owner_id,
        original_name: input.original_name,
        stored_name: stored.stored_name.clone(),
        format: input.format,
        resolution: input.resolution,
        status_id: state.vocabulary.code_for(JobState::InQueue),
    };

    let job = match JobRepo::create(&state.pool, &create).await {
        Ok(job) => job,
        Err(e) => {
            if let Err(cleanup) = state.store.remove(&stored.path).await {
                tracing::error!(
                    path = %stored.path.display(),
                    error = %cleanup,
                    "Failed to remove artifact after job insert failed",
                );
            }
            return Err(e.into());
        }
    };

    let envelope = DispatchEnvelope {
        format: job.format.clone(),
        resolution: job.resolution.clone(),
        save_path: state.store.save_path(job.owner_id, &job.stored_name),
    };

    let enqueued = match publish(state.queue.as_ref(), Lane::Normal, &envelope).await {
        Ok(()) => {
            if let Err(e) = JobRepo::mark_enqueued(&state.pool, job.id).await {
                tracing::warn!(job_id = job.id, error = %e, "Failed to stamp enqueued_at");
            }
            true
        }
        Err(e) => {
            tracing::error!(
                job_id = job.id,
                owner_id = job.owner_id,
                stored_name = %job.stored_name,
                error = %e,
                "Envelope push failed, job left for requeue sweep",
            );
            false
        }
    };

    tracing::info!(
        job_id = job.id,
        owner_id = job.owner_id,
        stored_name = %job.stored_name,
        format = %job.format,
        resolution = %job.resolution,
        enqueued,
        "Job submitted",
    );

    Ok(Submitted { job, enqueued })
}
