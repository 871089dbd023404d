/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Owners are identified by the numeric account id injected by the auth layer.
pub type OwnerId = DbId;

/// Status codes are the `job_statuses.id` values (BIGSERIAL).
pub type StatusId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
