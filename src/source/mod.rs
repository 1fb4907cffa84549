//! Event source abstraction for feeding decoded logs to a stream.

use crate::domain::ChainEvent;
use crate::store::StreamCursor;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod file;
pub mod mock;

pub use file::FileEventSource;
pub use mock::MockEventSource;

/// Ordered supply of decoded chain events for one stream.
///
/// Implementations return events strictly after the cursor watermark, ordered
/// by `(block_number, log_index)`.
#[async_trait]
pub trait EventSource: Send + Sync + fmt::Debug {
    async fn fetch_after(
        &self,
        cursor: &StreamCursor,
        limit: usize,
    ) -> Result<Vec<ChainEvent>, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Keep events after the watermark, in emission order, up to `limit`.
pub(crate) fn select_after(
    mut events: Vec<ChainEvent>,
    cursor: &StreamCursor,
    limit: usize,
) -> Vec<ChainEvent> {
    events.retain(|e| cursor.is_after(e.meta.block_number, e.meta.log_index));
    events.sort_by_key(|e| (e.meta.block_number, e.meta.log_index));
    events.truncate(limit);
    events
}
