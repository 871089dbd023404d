//! Worker report reconciliation.
//!
//! Reports address a job by `(owner_id, stored_name)`. Every update that
//! matches no row is a not-found error. Out-of-order transitions are logged
//! but still applied.

use cloudrender_core::envelope::{result_link, JobKey};
use cloudrender_core::error::CoreError;
use cloudrender_core::naming::{decode_status_segment, file_extension, result_file_name};
use cloudrender_core::status::{JobState, StatusVocabulary};
use cloudrender_core::types::StatusId;
use cloudrender_db::repositories::JobRepo;
use tokio::io::AsyncRead;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::StorageError;

fn not_found(key: &JobKey) -> AppError {
    AppError::Core(CoreError::NotFoundByKey {
        entity: "Job",
        key: key.to_string(),
    })
}

/// Apply a status report whose status arrives as a path segment (`in-progress`).
///
/// Returns the status code now stored on the job.
pub async fn apply_status_report(
    state: &AppState,
    key: &JobKey,
    status_segment: &str,
) -> AppResult<StatusId> {
    let name = decode_status_segment(status_segment);
    let code = state.vocabulary.require_code(&name)?;
    set_status(state, key, code).await?;
    Ok(code)
}

/// Persist a result artifact, mark the job `success`, and record its download link.
///
/// `upload_name` supplies the result's extension. Returns the result link.
pub async fn apply_completion<R>(
    state: &AppState,
    key: &JobKey,
    upload_name: &str,
    result: &mut R,
) -> AppResult<String>
where
    R: AsyncRead + Unpin + ?Sized,
{
    // Check first so a report for an unknown job leaves no file behind.
    if JobRepo::find_by_key(&state.pool, key).await?.is_none() {
        return Err(not_found(key));
    }

    let extension = file_extension(upload_name)?;
    let file_name = result_file_name(&key.stored_name, &extension);

    state
        .store
        .save_result(key.owner_id, &file_name, result)
        .await
        .map_err(|e| match e {
            StorageError::InvalidName(core) => AppError::Core(core),
            StorageError::Io(io) => {
                AppError::InternalError(format!("Failed to store result for {key}: {io}"))
            }
        })?;

    set_status(state, key, state.vocabulary.code_for(JobState::Success)).await?;

    let link = result_link(&state.config.public_base_url, key.owner_id, &file_name);
    if !JobRepo::update_result_link(&state.pool, key, &link).await? {
        return Err(not_found(key));
    }

    tracing::info!(owner_id = key.owner_id, stored_name = %key.stored_name, %link, "Result recorded");
    Ok(link)
}

async fn set_status(state: &AppState, key: &JobKey, code: StatusId) -> AppResult<()> {
    let previous = JobRepo::update_status(&state.pool, key, code)
        .await?
        .ok_or_else(|| not_found(key))?;

    observe_transition(&state.vocabulary, key, previous, code);
    Ok(())
}

/// Log the transition, warning when it runs against the forward lifecycle.
fn observe_transition(
    vocabulary: &StatusVocabulary,
    key: &JobKey,
    previous: StatusId,
    next: StatusId,
) -> bool {
    let from = vocabulary.name_of(previous).unwrap_or("unknown");
    let to = vocabulary.name_of(next).unwrap_or("unknown");

    let forward = match (vocabulary.state_of(previous), vocabulary.state_of(next)) {
        (Some(prev), Some(next)) => prev.can_transition_to(next),
        // Non-canonical statuses carry no ordering.
        _ => true,
    };

    if forward {
        tracing::info!(owner_id = key.owner_id, stored_name = %key.stored_name, from, to, "Job status updated");
    } else {
        tracing::warn!(
            owner_id = key.owner_id,
            stored_name = %key.stored_name,
            from,
            to,
            "Out-of-order status report applied",
        );
    }
    forward
}
