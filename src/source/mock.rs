//! In-memory event source for tests.

use super::{select_after, EventSource, SourceError};
use crate::domain::ChainEvent;
use crate::store::StreamCursor;
use async_trait::async_trait;
use std::sync::Mutex;

/// Mock source holding a fixed event list. Can be told to fail a number of polls.
#[derive(Debug, Default)]
pub struct MockEventSource {
    events: Mutex<Vec<ChainEvent>>,
    failures_left: Mutex<usize>,
}

impl MockEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(self, events: Vec<ChainEvent>) -> Self {
        self.push_all(events);
        self
    }

    /// Fail the next `n` polls with `SourceError::Unavailable`.
    pub fn with_failures(self, n: usize) -> Self {
        *self.failures_left.lock().unwrap_or_else(|p| p.into_inner()) = n;
        self
    }

    /// Append events, e.g. to simulate new blocks.
    pub fn push_all(&self, events: Vec<ChainEvent>) {
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .extend(events);
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn fetch_after(
        &self,
        cursor: &StreamCursor,
        limit: usize,
    ) -> Result<Vec<ChainEvent>, SourceError> {
        {
            let mut failures = self.failures_left.lock().unwrap_or_else(|p| p.into_inner());
            if *failures > 0 {
                *failures -= 1;
                return Err(SourceError::Unavailable("mock failure".to_string()));
            }
        }
        let events = self
            .events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        Ok(select_after(events, cursor, limit))
    }
}
