use crate::types::DbId;

/// Domain-level errors shared by every crate in the workspace.
///
/// The HTTP layer maps each variant onto a status code. Store and queue
/// failures travel in their own error types and are sanitized there.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// Lookup by a natural key (e.g. owner + stored name) matched nothing.
    #[error("Entity not found: {entity} with key {key}")]
    NotFoundByKey { entity: &'static str, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Data was irrecoverably lost, e.g. a corrupt envelope that was already popped.
    #[error("Data loss: {0}")]
    DataLoss(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_by_key_mentions_key() {
        let err = CoreError::NotFoundByKey {
            entity: "Job",
            key: "7/1700000000.blend".into(),
        };
        assert_eq!(
            err.to_string(),
            "Entity not found: Job with key 7/1700000000.blend"
        );
    }
}
