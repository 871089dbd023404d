//! Periodic republishing of jobs stuck in `in queue`.
//!
//! The job row and its envelope live in separate systems, so a row can be
//! queued with no envelope behind it (the push after insert failed, or the
//! queue was flushed). Each sweep selects queued, non-deleted jobs whose
//! envelope was never pushed or was pushed longer ago than `stale_after`.
//! A job whose envelope is still waiting in either lane only has
//! `enqueued_at` restamped; the rest are republished on the priority lane.
//!
//! A job popped by a worker that has not reported yet is still `in queue`
//! with no envelope, so it can be republished once it goes stale.

use std::sync::Arc;

use chrono::Utc;
use cloudrender_core::envelope::DispatchEnvelope;
use cloudrender_core::status::JobState;
use cloudrender_db::repositories::JobRepo;
use cloudrender_queue::{is_waiting, publish, Lane};
use tokio_util::sync::CancellationToken;

use crate::config::RequeueConfig;
use crate::state::AppState;

/// Outcome of a single sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub selected: usize,
    pub republished: usize,
    /// Selected jobs whose envelope was found still waiting.
    pub still_waiting: usize,
}

/// Run the sweep loop until `cancel` is triggered. Returns immediately when
/// the sweep is disabled.
pub async fn run(state: AppState, config: RequeueConfig, cancel: CancellationToken) {
    let Some(period) = config.interval else {
        tracing::info!("Requeue sweep disabled");
        return;
    };

    tracing::info!(
        interval_secs = period.as_secs(),
        stale_after_secs = config.stale_after.as_secs(),
        batch_size = config.batch_size,
        "Requeue sweep started"
    );

    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Requeue sweep stopping");
                break;
            }
            _ = interval.tick() => {
                match sweep_once(&state, &config).await {
                    Ok(report) if report.selected > 0 => {
                        tracing::info!(
                            selected = report.selected,
                            republished = report.republished,
                            still_waiting = report.still_waiting,
                            "Requeue sweep: republished stale jobs"
                        );
                    }
                    Ok(_) => tracing::debug!("Requeue sweep: nothing to republish"),
                    Err(e) => tracing::error!(error = %e, "Requeue sweep failed"),
                }
            }
        }
    }
}

/// Republish one batch of stale queued jobs.
///
/// A queue failure stops the batch; the remaining jobs are picked up by the
/// next sweep.
pub async fn sweep_once(state: &AppState, config: &RequeueConfig) -> Result<SweepReport, sqlx::Error> {
    let stale_after = chrono::Duration::from_std(config.stale_after)
        .unwrap_or_else(|_| chrono::Duration::MAX);
    let cutoff = Utc::now()
        .checked_sub_signed(stale_after)
        .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);

    let jobs = JobRepo::list_stale_queued(
        &state.pool,
        state.vocabulary.code_for(JobState::InQueue),
        cutoff,
        config.batch_size,
    )
    .await?;

    let mut report = SweepReport {
        selected: jobs.len(),
        republished: 0,
        still_waiting: 0,
    };

    let queue = Arc::clone(&state.queue);
    for job in jobs {
        let envelope = DispatchEnvelope {
            format: job.format.clone(),
            resolution: job.resolution.clone(),
            save_path: state.store.save_path(job.owner_id, &job.stored_name),
        };

        match is_waiting(queue.as_ref(), &envelope).await {
            Ok(true) => {
                JobRepo::mark_enqueued(&state.pool, job.id).await?;
                report.still_waiting += 1;
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(job_id = job.id, error = %e, "Requeue sweep: lane scan failed, stopping batch");
                break;
            }
        }

        if let Err(e) = publish(queue.as_ref(), Lane::Priority, &envelope).await {
            tracing::warn!(job_id = job.id, error = %e, "Requeue sweep: push failed, stopping batch");
            break;
        }
        JobRepo::mark_enqueued(&state.pool, job.id).await?;
        report.republished += 1;

        tracing::debug!(
            job_id = job.id,
            owner_id = job.owner_id,
            stored_name = %job.stored_name,
            first_push = job.enqueued_at.is_none(),
            "Requeue sweep: job republished"
        );
    }

    Ok(report)
}
