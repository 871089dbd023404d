//! Redis-backed dispatch lanes.
//!
//! Each lane is a Redis list. Producers `RPUSH` onto the tail and pollers
//! `BLPOP` from the head, so every entry is handed to exactly one popper by
//! Redis itself.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::instrument;

use crate::{DispatchQueue, Lane, QueueError};

/// Redis list names for the two lanes.
#[derive(Debug, Clone)]
pub struct QueueKeys {
    pub priority: String,
    pub normal: String,
}

impl Default for QueueKeys {
    fn default() -> Self {
        Self {
            priority: "render-list-priority".to_string(),
            normal: "render-list".to_string(),
        }
    }
}

impl QueueKeys {
    fn key(&self, lane: Lane) -> &str {
        match lane {
            Lane::Priority => &self.priority,
            Lane::Normal => &self.normal,
        }
    }
}

/// Dispatch queue stored in two Redis lists.
///
/// Pushes and inspection share one auto-reconnecting connection. A blocking
/// pop holds its connection for the whole wait, so every pop opens its own.
#[derive(Clone)]
pub struct RedisQueue {
    client: redis::Client,
    shared: ConnectionManager,
    keys: QueueKeys,
}

impl RedisQueue {
    /// Connect to `redis_url` and verify the server answers.
    pub async fn connect(redis_url: &str, keys: QueueKeys) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| QueueError::Connection(e.to_string()))?;
        let shared = client
            .get_connection_manager()
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))?;

        let queue = Self {
            client,
            shared,
            keys,
        };
        queue.ping().await?;
        tracing::info!(
            priority = %queue.keys.priority,
            normal = %queue.keys.normal,
            "Connected to dispatch queue",
        );
        Ok(queue)
    }
}

#[async_trait]
impl DispatchQueue for RedisQueue {
    #[instrument(skip(self, payload), fields(key = self.keys.key(lane)), err)]
    async fn push(&self, lane: Lane, payload: &str) -> Result<(), QueueError> {
        let mut conn = self.shared.clone();
        let _: i64 = redis::cmd("RPUSH")
            .arg(self.keys.key(lane))
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn pop(&self, lane: Lane, wait: Duration) -> Result<Option<String>, QueueError> {
        let key = self.keys.key(lane);

        // BLPOP treats a zero timeout as "block forever".
        if wait.is_zero() {
            let mut conn = self.shared.clone();
            let value: Option<String> = redis::cmd("LPOP").arg(key).query_async(&mut conn).await?;
            return Ok(value);
        }

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))?;

        // Fractional timeouts need Redis 6 or newer.
        let popped: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(key)
            .arg(wait.as_secs_f64())
            .query_async(&mut conn)
            .await?;

        Ok(popped.map(|(_, payload)| payload))
    }

    async fn len(&self, lane: Lane) -> Result<usize, QueueError> {
        let mut conn = self.shared.clone();
        let len: usize = redis::cmd("LLEN")
            .arg(self.keys.key(lane))
            .query_async(&mut conn)
            .await?;
        Ok(len)
    }

    async fn contains(&self, lane: Lane, payload: &str) -> Result<bool, QueueError> {
        let mut conn = self.shared.clone();
        // LPOS needs Redis 6.0.6 or newer.
        let position: Option<i64> = redis::cmd("LPOS")
            .arg(self.keys.key(lane))
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(position.is_some())
    }

    async fn ping(&self) -> Result<(), QueueError> {
        let mut conn = self.shared.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
