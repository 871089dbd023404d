//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod job_repo;
pub mod job_status_repo;

pub use job_repo::JobRepo;
pub use job_status_repo::{JobStatusRepo, VocabularyError};
