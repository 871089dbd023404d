//! In-process dispatch lanes for tests and single-node development.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::{DispatchQueue, Lane, QueueError};

#[derive(Default)]
struct LaneBuffer {
    entries: Mutex<VecDeque<String>>,
    arrived: Notify,
}

impl LaneBuffer {
    fn try_pop(&self) -> Result<Option<String>, QueueError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| QueueError::Command("lane lock poisoned".into()))?;
        Ok(entries.pop_front())
    }
}

/// A [`DispatchQueue`] held in process memory.
///
/// Same delivery rules as the Redis lists: FIFO per lane, each entry popped
/// at most once, pops wait up to the given bound.
#[derive(Default)]
pub struct MemoryQueue {
    priority: LaneBuffer,
    normal: LaneBuffer,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lane(&self, lane: Lane) -> &LaneBuffer {
        match lane {
            Lane::Priority => &self.priority,
            Lane::Normal => &self.normal,
        }
    }
}

#[async_trait]
impl DispatchQueue for MemoryQueue {
    async fn push(&self, lane: Lane, payload: &str) -> Result<(), QueueError> {
        let buffer = self.lane(lane);
        buffer
            .entries
            .lock()
            .map_err(|_| QueueError::Command("lane lock poisoned".into()))?
            .push_back(payload.to_string());
        buffer.arrived.notify_one();
        Ok(())
    }

    async fn pop(&self, lane: Lane, wait: Duration) -> Result<Option<String>, QueueError> {
        let buffer = self.lane(lane);
        let deadline = Instant::now() + wait;

        loop {
            // Register for a wake-up before checking so a push between the
            // check and the wait is not missed.
            let arrived = buffer.arrived.notified();
            tokio::pin!(arrived);
            arrived.as_mut().enable();

            if let Some(payload) = buffer.try_pop()? {
                return Ok(Some(payload));
            }
            if tokio::time::timeout_at(deadline, arrived).await.is_err() {
                return buffer.try_pop();
            }
        }
    }

    async fn len(&self, lane: Lane) -> Result<usize, QueueError> {
        let entries = self
            .lane(lane)
            .entries
            .lock()
            .map_err(|_| QueueError::Command("lane lock poisoned".into()))?;
        Ok(entries.len())
    }

    async fn contains(&self, lane: Lane, payload: &str) -> Result<bool, QueueError> {
        let entries = self
            .lane(lane)
            .entries
            .lock()
            .map_err(|_| QueueError::Command("lane lock poisoned".into()))?;
        Ok(entries.iter().any(|entry| entry == payload))
    }

    async fn ping(&self) -> Result<(), QueueError> {
        Ok(())
    }
}
