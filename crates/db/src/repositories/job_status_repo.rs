//! Repository for the `job_statuses` lookup table.

use cloudrender_core::error::CoreError;
use cloudrender_core::status::StatusVocabulary;
use sqlx::PgPool;

use crate::models::status::JobStatusRow;

/// Failure to build the status vocabulary at startup.
#[derive(Debug, thiserror::Error)]
pub enum VocabularyError {
    #[error("Failed to read job statuses: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Job status table is inconsistent: {0}")]
    Invalid(#[from] CoreError),
}

pub struct JobStatusRepo;

impl JobStatusRepo {
    /// List all status rows ordered by id.
    pub async fn list(pool: &PgPool) -> Result<Vec<JobStatusRow>, sqlx::Error> {
        sqlx::query_as::<_, JobStatusRow>("SELECT id, name FROM job_statuses ORDER BY id")
            .fetch_all(pool)
            .await
    }

    /// Insert a status name and return the new row.
    pub async fn create(pool: &PgPool, name: &str) -> Result<JobStatusRow, sqlx::Error> {
        sqlx::query_as::<_, JobStatusRow>(
            "INSERT INTO job_statuses (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(pool)
        .await
    }

    /// Read the table once and build the read-only vocabulary.
    pub async fn load_vocabulary(pool: &PgPool) -> Result<StatusVocabulary, VocabularyError> {
        let rows = Self::list(pool).await?;
        let vocabulary =
            StatusVocabulary::from_entries(rows.into_iter().map(|row| (row.id, row.name)))?;
        tracing::debug!(statuses = vocabulary.len(), "Loaded job status vocabulary");
        Ok(vocabulary)
    }
}
