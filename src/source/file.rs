//! Newline-delimited JSON event file, re-read on every poll.

use super::{select_after, EventSource, SourceError};
use crate::domain::ChainEvent;
use crate::store::StreamCursor;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::warn;

/// Reads one `ChainEvent` JSON object per line. Malformed lines are logged and skipped.
#[derive(Debug, Clone)]
pub struct FileEventSource {
    path: PathBuf,
}

impl FileEventSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(&self, contents: &str) -> Vec<ChainEvent> {
        let mut events = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<ChainEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    warn!(path = %self.path.display(), line = index + 1, error = %e, "Failed to parse event line");
                }
            }
        }
        events
    }
}

#[async_trait]
impl EventSource for FileEventSource {
    async fn fetch_after(
        &self,
        cursor: &StreamCursor,
        limit: usize,
    ) -> Result<Vec<ChainEvent>, SourceError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            // Nothing emitted yet.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SourceError::Io {
                    path: self.path.display().to_string(),
                    source: e,
                })
            }
        };
        Ok(select_after(self.parse(&contents), cursor, limit))
    }
}
