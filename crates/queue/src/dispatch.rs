//! Envelope-level operations over a [`DispatchQueue`].

use std::time::Duration;

use cloudrender_core::envelope::DispatchEnvelope;

use crate::{DispatchQueue, Lane, QueueError};

/// Failure while taking the next envelope off the queue.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The payload was popped but does not decode. It is gone from the queue.
    #[error("Corrupt dispatch envelope: {source}")]
    CorruptEnvelope {
        payload: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Serialize `envelope` and append it to `lane`.
pub async fn publish(
    queue: &dyn DispatchQueue,
    lane: Lane,
    envelope: &DispatchEnvelope,
) -> Result<(), QueueError> {
    let payload = envelope.to_payload()?;
    queue.push(lane, &payload).await
}

/// Whether `envelope` is still waiting in either lane.
pub async fn is_waiting(
    queue: &dyn DispatchQueue,
    envelope: &DispatchEnvelope,
) -> Result<bool, QueueError> {
    let payload = envelope.to_payload()?;
    for lane in [Lane::Priority, Lane::Normal] {
        if queue.contains(lane, &payload).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Take the next envelope, preferring the priority lane.
///
/// Waits up to `wait` on the priority lane and then up to `wait` on the
/// normal lane. `Ok(None)` means both waits elapsed with nothing to hand out.
/// A priority-lane failure is logged and the normal lane is still consulted.
pub async fn next_envelope(
    queue: &dyn DispatchQueue,
    wait: Duration,
) -> Result<Option<DispatchEnvelope>, DispatchError> {
    let payload = match queue.pop(Lane::Priority, wait).await {
        Ok(Some(payload)) => Some(payload),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(error = %e, "Priority lane pop failed, falling back to normal lane");
            None
        }
    };

    let payload = match payload {
        Some(payload) => payload,
        None => match queue.pop(Lane::Normal, wait).await? {
            Some(payload) => payload,
            None => return Ok(None),
        },
    };

    DispatchEnvelope::from_payload(&payload)
        .map(Some)
        .map_err(|source| {
            tracing::error!(
                payload = %payload,
                error = %source,
                "Discarding undecodable dispatch envelope",
            );
            DispatchError::CorruptEnvelope { payload, source }
        })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::MemoryQueue;

    const WAIT: Duration = Duration::from_millis(10);

    fn envelope(file: &str) -> DispatchEnvelope {
        DispatchEnvelope {
            format: "png".into(),
            resolution: "1920x1080".into(),
            save_path: format!("storage/input/7/{file}"),
        }
    }

    /// A queue whose priority lane is unreachable.
    struct BrokenPriority(MemoryQueue);

    #[async_trait::async_trait]
    impl DispatchQueue for BrokenPriority {
        async fn push(&self, lane: Lane, payload: &str) -> Result<(), QueueError> {
            self.0.push(lane, payload).await
        }

        async fn pop(&self, lane: Lane, wait: Duration) -> Result<Option<String>, QueueError> {
            match lane {
                Lane::Priority => Err(QueueError::Connection("refused".into())),
                Lane::Normal => self.0.pop(lane, wait).await,
            }
        }

        async fn len(&self, lane: Lane) -> Result<usize, QueueError> {
            self.0.len(lane).await
        }

        async fn contains(&self, lane: Lane, payload: &str) -> Result<bool, QueueError> {
            self.0.contains(lane, payload).await
        }

        async fn ping(&self) -> Result<(), QueueError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn priority_lane_drains_first() {
        let queue = MemoryQueue::new();
        publish(&queue, Lane::Normal, &envelope("n1.blend")).await.unwrap();
        publish(&queue, Lane::Priority, &envelope("p1.blend")).await.unwrap();
        publish(&queue, Lane::Priority, &envelope("p2.blend")).await.unwrap();

        let order: Vec<String> = [
            next_envelope(&queue, WAIT).await.unwrap(),
            next_envelope(&queue, WAIT).await.unwrap(),
            next_envelope(&queue, WAIT).await.unwrap(),
        ]
        .into_iter()
        .map(|e| e.unwrap().job_key().unwrap().stored_name)
        .collect();

        assert_eq!(order, vec!["p1.blend", "p2.blend", "n1.blend"]);
    }

    #[tokio::test]
    async fn empty_queue_yields_none() {
        let queue = MemoryQueue::new();
        assert_matches!(next_envelope(&queue, WAIT).await, Ok(None));
    }

    #[tokio::test]
    async fn corrupt_payload_is_consumed_and_reported() {
        let queue = MemoryQueue::new();
        queue.push(Lane::Normal, "{not json").await.unwrap();

        let err = next_envelope(&queue, WAIT).await.unwrap_err();
        assert_matches!(err, DispatchError::CorruptEnvelope { ref payload, .. } if payload == "{not json");
        assert_eq!(queue.len(Lane::Normal).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn priority_failure_falls_back_to_normal() {
        let queue = BrokenPriority(MemoryQueue::new());
        publish(&queue, Lane::Normal, &envelope("n1.blend")).await.unwrap();

        let env = next_envelope(&queue, WAIT).await.unwrap().unwrap();
        assert_eq!(env.save_path, "storage/input/7/n1.blend");
    }

    #[tokio::test]
    async fn waiting_envelope_is_found_in_either_lane() {
        let queue = MemoryQueue::new();
        publish(&queue, Lane::Priority, &envelope("p1.blend")).await.unwrap();
        publish(&queue, Lane::Normal, &envelope("n1.blend")).await.unwrap();

        assert!(is_waiting(&queue, &envelope("p1.blend")).await.unwrap());
        assert!(is_waiting(&queue, &envelope("n1.blend")).await.unwrap());
        assert!(!is_waiting(&queue, &envelope("gone.blend")).await.unwrap());
    }

    #[tokio::test]
    async fn round_trip_preserves_render_parameters() {
        let queue = MemoryQueue::new();
        let sent = envelope("1700000000.blend");
        publish(&queue, Lane::Normal, &sent).await.unwrap();

        let received = next_envelope(&queue, WAIT).await.unwrap().unwrap();
        assert_eq!(received, sent);
    }
}
