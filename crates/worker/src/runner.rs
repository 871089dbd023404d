//! Poll loop: pull, download, render, report.
//!
//! Once a job's key is known every failure is reported back as `error`.
//! A job in hand is finished before the loop honours cancellation.

use std::path::{Path, PathBuf};

use cloudrender_core::envelope::{parse_retrieval_link, JobKey};
use cloudrender_core::error::CoreError;
use cloudrender_core::naming::result_file_name;
use cloudrender_core::render::Resolution;
use cloudrender_core::status::JobState;
use tokio_util::sync::CancellationToken;

use crate::client::{ApiError, Assignment, RenderApi};
use crate::config::WorkerConfig;
use crate::render::{RenderError, RenderJob};

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("invalid assignment: {0}")]
    Assignment(#[from] CoreError),

    #[error("scratch directory: {0}")]
    Io(#[from] std::io::Error),
}

/// What a single poll did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Idle,
    Completed { key: JobKey, result_link: String },
    Failed { key: Option<JobKey>, error: String },
}

pub struct Worker {
    api: RenderApi,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(api: RenderApi, config: WorkerConfig) -> Self {
        Self { api, config }
    }

    /// Poll until `cancel` fires. Sleeps `poll_interval` after an empty
    /// poll or a failed pull; polls again immediately after a job.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            api_url = %self.config.api_url,
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "Worker started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let busy = match self.poll_once().await {
                Ok(PollOutcome::Idle) => false,
                Ok(PollOutcome::Completed { key, result_link }) => {
                    tracing::info!(job = %key, %result_link, "Job rendered");
                    true
                }
                Ok(PollOutcome::Failed { key, error }) => {
                    tracing::warn!(job = ?key.map(|k| k.to_string()), %error, "Job failed");
                    true
                }
                Err(e) => {
                    tracing::error!(error = %e, "Pull failed");
                    false
                }
            };

            if !busy {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }

        tracing::info!("Worker stopped");
    }

    /// Pull one assignment and process it.
    ///
    /// Only a failed pull is an `Err`; failures after the pull are folded
    /// into [`PollOutcome::Failed`] once they have been reported.
    pub async fn poll_once(&self) -> Result<PollOutcome, ApiError> {
        let Some(assignment) = self.api.request_job().await? else {
            tracing::debug!("No work available");
            return Ok(PollOutcome::Idle);
        };

        let key = match parse_retrieval_link(&assignment.download_link) {
            Ok(key) => key,
            Err(e) => {
                // Nothing to address a report to.
                tracing::error!(link = %assignment.download_link, error = %e, "Unusable assignment");
                return Ok(PollOutcome::Failed {
                    key: None,
                    error: e.to_string(),
                });
            }
        };
        tracing::info!(job = %key, format = %assignment.format, resolution = %assignment.resolution, "Job pulled");

        let scratch = self.config.work_dir.join(uuid::Uuid::new_v4().to_string());
        let result = self.process(&key, &assignment, &scratch).await;

        if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %scratch.display(), error = %e, "Failed to remove scratch directory");
            }
        }

        match result {
            Ok(result_link) => Ok(PollOutcome::Completed { key, result_link }),
            Err(e) => {
                if let Err(report) = self.api.update_status(&key, JobState::Error).await {
                    tracing::error!(job = %key, error = %report, "Failed to report job error");
                }
                Ok(PollOutcome::Failed {
                    key: Some(key),
                    error: e.to_string(),
                })
            }
        }
    }

    async fn process(
        &self,
        key: &JobKey,
        assignment: &Assignment,
        scratch: &Path,
    ) -> Result<String, WorkerError> {
        let resolution: Resolution = assignment.resolution.parse()?;
        tokio::fs::create_dir_all(scratch).await?;

        let input = scratch.join(&key.stored_name);
        let bytes = self.api.download(&assignment.download_link, &input).await?;
        tracing::debug!(job = %key, bytes, "Artifact downloaded");

        self.api.update_status(key, JobState::InProgress).await?;

        let output = output_path(scratch, &key.stored_name, &assignment.format);
        self.config
            .render_command
            .run(&RenderJob {
                input: &input,
                output: &output,
                format: &assignment.format,
                resolution,
            })
            .await?;

        Ok(self.api.upload_result(key, &output).await?)
    }
}

/// `{scratch}/{stored_name}.{format}`.
fn output_path(scratch: &Path, stored_name: &str, format: &str) -> PathBuf {
    scratch.join(result_file_name(stored_name, format))
}
