use cloudrender_core::types::StatusId;
use sqlx::FromRow;

/// A row from the `job_statuses` lookup table.
#[derive(Debug, Clone, FromRow)]
pub struct JobStatusRow {
    pub id: StatusId,
    pub name: String,
}
