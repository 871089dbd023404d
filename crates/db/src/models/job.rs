//! Job entity model and insert DTO.

use cloudrender_core::envelope::JobKey;
use cloudrender_core::types::{DbId, OwnerId, StatusId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub owner_id: OwnerId,
    pub original_name: String,
    pub stored_name: String,
    pub format: String,
    pub resolution: String,
    pub status_id: StatusId,
    pub result_link: Option<String>,
    pub is_deleted: bool,
    /// When the last envelope for this job was pushed; `None` if no push succeeded.
    pub enqueued_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    pub fn key(&self) -> JobKey {
        JobKey {
            owner_id: self.owner_id,
            stored_name: self.stored_name.clone(),
        }
    }
}

/// Insert DTO for a newly submitted job.
#[derive(Debug, Clone)]
pub struct CreateJob {
    pub owner_id: OwnerId,
    pub original_name: String,
    pub stored_name: String,
    pub format: String,
    pub resolution: String,
    pub status_id: StatusId,
}
