use std::sync::Arc;

use cloudrender_core::status::StatusVocabulary;
use cloudrender_queue::DispatchQueue;

use crate::config::ServerConfig;
use crate::storage::ArtifactStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: cloudrender_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Priority and normal dispatch lanes.
    pub queue: Arc<dyn DispatchQueue>,
    /// Status name/code mapping, loaded once at startup.
    pub vocabulary: Arc<StatusVocabulary>,
    pub store: Arc<ArtifactStore>,
}
