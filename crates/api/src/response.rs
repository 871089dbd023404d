//! Shared response envelope for API handlers.
//!
//! Every reply carries a top-level `status` of `"OK"`, `"Empty"` or
//! `"Error"` (errors are rendered by [`crate::error::AppError`]). The payload
//! fields sit beside it, not nested under a key.

use serde::Serialize;

/// Outcome marker carried by every response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReplyStatus {
    #[serde(rename = "OK")]
    Ok,
    Empty,
    Error,
}

/// `{ "status": ..., ...payload }` response envelope.
#[derive(Debug, Serialize)]
pub struct Reply<T: Serialize> {
    pub status: ReplyStatus,
    #[serde(flatten)]
    pub body: T,
}

/// Payload for replies that carry nothing beyond their status.
#[derive(Debug, Serialize)]
pub struct NoBody {}

impl<T: Serialize> Reply<T> {
    pub fn ok(body: T) -> Self {
        Self {
            status: ReplyStatus::Ok,
            body,
        }
    }
}

impl Reply<NoBody> {
    pub fn done() -> Self {
        Self::ok(NoBody {})
    }

    pub fn empty() -> Self {
        Self {
            status: ReplyStatus::Empty,
            body: NoBody {},
        }
    }
}
