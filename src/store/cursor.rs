//! Per-stream watermark for resumable event processing.

use serde::{Deserialize, Serialize};

/// Position of the last event applied by a stream.
///
/// Stored after every applied event so a restarted stream resumes after it.
/// Replaying from an older position is safe because commits are keyed by event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamCursor {
    /// Stream identifier, `{chainId}` or `{chainId}-{label}`.
    pub stream_id: String,
    pub last_block: Option<u64>,
    pub last_log_index: Option<u64>,
    /// Idempotency key of the last applied event.
    pub last_event_key: Option<String>,
}

impl StreamCursor {
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            last_block: None,
            last_log_index: None,
            last_event_key: None,
        }
    }

    pub fn with_watermark(
        stream_id: impl Into<String>,
        last_block: u64,
        last_log_index: u64,
        last_event_key: String,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            last_block: Some(last_block),
            last_log_index: Some(last_log_index),
            last_event_key: Some(last_event_key),
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.last_event_key.is_none()
    }

    pub fn advance(&mut self, block: u64, log_index: u64, event_key: String) {
        self.last_block = Some(block);
        self.last_log_index = Some(log_index);
        self.last_event_key = Some(event_key);
    }

    /// True if `(block, log_index)` is strictly after the watermark.
    pub fn is_after(&self, block: u64, log_index: u64) -> bool {
        match (self.last_block, self.last_log_index) {
            (Some(b), Some(i)) => (block, log_index) > (b, i),
            _ => true,
        }
    }
}
