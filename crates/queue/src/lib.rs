//! Dispatch queue: a pair of ephemeral FIFO lists (priority and normal)
//! holding serialized [`DispatchEnvelope`]s between submission and the
//! single worker poll that consumes each one.
//!
//! [`DispatchEnvelope`]: cloudrender_core::envelope::DispatchEnvelope

pub mod dispatch;
pub mod error;
pub mod memory;
pub mod redis_queue;

use std::time::Duration;

use async_trait::async_trait;

pub use dispatch::{is_waiting, next_envelope, publish, DispatchError};
pub use error::QueueError;
pub use memory::MemoryQueue;
pub use redis_queue::{QueueKeys, RedisQueue};

/// Which of the two lists an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    Priority,
    Normal,
}

impl Lane {
    pub fn as_str(self) -> &'static str {
        match self {
            Lane::Priority => "priority",
            Lane::Normal => "normal",
        }
    }
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backing store for the two dispatch lanes.
///
/// Each pushed payload is returned by at most one `pop`, across every
/// process sharing the backing store.
#[async_trait]
pub trait DispatchQueue: Send + Sync {
    /// Append a payload to the tail of `lane`.
    async fn push(&self, lane: Lane, payload: &str) -> Result<(), QueueError>;

    /// Remove and return the head of `lane`, waiting up to `wait` for one to
    /// arrive. `Ok(None)` means the wait elapsed with the lane empty.
    async fn pop(&self, lane: Lane, wait: Duration) -> Result<Option<String>, QueueError>;

    /// Number of payloads currently waiting in `lane`.
    async fn len(&self, lane: Lane) -> Result<usize, QueueError>;

    /// Whether an entry equal to `payload` is waiting in `lane`.
    async fn contains(&self, lane: Lane, payload: &str) -> Result<bool, QueueError>;

    /// Round-trip to the backing store.
    async fn ping(&self) -> Result<(), QueueError>;
}
