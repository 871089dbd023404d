//! Repository for the `jobs` table.
//!
//! Status and result updates are addressed by the `(owner_id, stored_name)`
//! natural key because that is all a worker carries forward from the
//! envelope. Zero-row updates come back as `None`/`false` so callers can
//! turn them into a not-found error.

use cloudrender_core::envelope::JobKey;
use cloudrender_core::types::{DbId, OwnerId, StatusId, Timestamp};
use sqlx::PgPool;

use crate::models::job::{CreateJob, Job};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, owner_id, original_name, stored_name, format, resolution, \
    status_id, result_link, is_deleted, enqueued_at, created_at, updated_at";

/// Provides persistence operations for render jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new job row and return it.
    pub async fn create(pool: &PgPool, input: &CreateJob) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (owner_id, original_name, stored_name, format, resolution, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(input.owner_id)
            .bind(&input.original_name)
            .bind(&input.stored_name)
            .bind(&input.format)
            .bind(&input.resolution)
            .bind(input.status_id)
            .fetch_one(pool)
            .await
    }

    /// Find a non-deleted job by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1 AND NOT is_deleted");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job by id regardless of its deleted flag (audit access).
    pub async fn find_by_id_including_deleted(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job by its natural key regardless of its deleted flag.
    pub async fn find_by_key(pool: &PgPool, key: &JobKey) -> Result<Option<Job>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM jobs WHERE owner_id = $1 AND stored_name = $2");
        sqlx::query_as::<_, Job>(&query)
            .bind(key.owner_id)
            .bind(&key.stored_name)
            .fetch_optional(pool)
            .await
    }

    /// List an owner's non-deleted jobs, newest first.
    pub async fn list_by_owner(pool: &PgPool, owner_id: OwnerId) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE owner_id = $1 AND NOT is_deleted \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// Set the status of the job identified by `key`.
    ///
    /// Returns the status the job had before the update, or `None` when no
    /// row matched. The previous value is read under the same row lock as
    /// the write.
    pub async fn update_status(
        pool: &PgPool,
        key: &JobKey,
        status_id: StatusId,
    ) -> Result<Option<StatusId>, sqlx::Error> {
        sqlx::query_scalar::<_, StatusId>(
            "UPDATE jobs AS j SET status_id = $3 \
             FROM ( \
                 SELECT id, status_id FROM jobs \
                 WHERE owner_id = $1 AND stored_name = $2 \
                 FOR UPDATE \
             ) AS prev \
             WHERE j.id = prev.id \
             RETURNING prev.status_id",
        )
        .bind(key.owner_id)
        .bind(&key.stored_name)
        .bind(status_id)
        .fetch_optional(pool)
        .await
    }

    /// Set the result link of the job identified by `key`.
    ///
    /// Returns `false` when no row matched.
    pub async fn update_result_link(
        pool: &PgPool,
        key: &JobKey,
        link: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET result_link = $3 WHERE owner_id = $1 AND stored_name = $2",
        )
        .bind(key.owner_id)
        .bind(&key.stored_name)
        .bind(link)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete a job. Returns `false` if it does not exist or is already deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE jobs SET is_deleted = TRUE WHERE id = $1 AND NOT is_deleted")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record that an envelope for this job was just pushed.
    pub async fn mark_enqueued(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE jobs SET enqueued_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Jobs still in `queued_status` whose envelope was never pushed or was
    /// last pushed before `cutoff`. Oldest first, at most `limit` rows.
    pub async fn list_stale_queued(
        pool: &PgPool,
        queued_status: StatusId,
        cutoff: Timestamp,
        limit: i64,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE status_id = $1 AND NOT is_deleted \
               AND (enqueued_at IS NULL OR enqueued_at < $2) \
             ORDER BY created_at ASC, id ASC \
             LIMIT $3"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(queued_status)
            .bind(cutoff)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
