use crate::domain::ChainEvent;
use crate::engine::{Outcome, ProjectionError, Projector};
use crate::source::{EventSource, SourceError};
use crate::store::{StoreError, StreamCursor};
use backoff::future::retry;
use backoff::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counters for one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub fetched: usize,
    pub applied: usize,
    pub skipped: usize,
    pub duplicates: usize,
}

impl PollStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Applied { .. } => self.applied += 1,
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Duplicate => self.duplicates += 1,
        }
    }

    fn merge(&mut self, other: PollStats) {
        self.fetched += other.fetched;
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.duplicates += other.duplicates;
    }
}

/// Sequentially applies one chain's events and tracks its watermark.
#[derive(Debug, Clone)]
pub struct StreamRunner {
    stream_id: String,
    source: Arc<dyn EventSource>,
    projector: Projector,
    batch_size: usize,
    poll_interval: Duration,
    retry_initial: Duration,
    retry_max_elapsed: Option<Duration>,
}

impl StreamRunner {
    pub fn new(
        stream_id: impl Into<String>,
        source: Arc<dyn EventSource>,
        projector: Projector,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            source,
            projector,
            batch_size: 500,
            poll_interval: Duration::from_millis(2000),
            retry_initial: Duration::from_millis(500),
            retry_max_elapsed: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Retry policy for infrastructure failures. `None` retries forever.
    pub fn with_retry(mut self, initial: Duration, max_elapsed: Option<Duration>) -> Self {
        self.retry_initial = initial;
        self.retry_max_elapsed = max_elapsed;
        self
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.retry_initial,
            initial_interval: self.retry_initial,
            max_elapsed_time: self.retry_max_elapsed,
            ..Default::default()
        }
    }

    /// Stored watermark, or a fresh cursor for a new stream.
    pub async fn load_cursor(&self) -> Result<StreamCursor, StreamError> {
        let stored = self.projector.store().load_cursor(&self.stream_id).await?;
        Ok(stored.unwrap_or_else(|| StreamCursor::new(self.stream_id.clone())))
    }

    /// Fetch one batch after the cursor and apply it in order.
    ///
    /// The cursor is persisted after every event, so a crash mid-batch
    /// resumes at the next event.
    pub async fn poll_once(&self, cursor: &mut StreamCursor) -> Result<PollStats, StreamError> {
        let events = self.fetch_with_retry(cursor).await?;
        let mut stats = PollStats {
            fetched: events.len(),
            ..Default::default()
        };

        for event in &events {
            let meta = &event.meta;
            if !cursor.is_after(meta.block_number, meta.log_index) {
                debug!(stream = %self.stream_id, event_key = %event.event_key(), "Event behind watermark, ignoring");
                continue;
            }
            let outcome = self.apply_with_retry(event).await?;
            stats.record(outcome);

            cursor.advance(meta.block_number, meta.log_index, event.event_key());
            self.store_cursor_with_retry(cursor).await?;
        }

        if stats.fetched > 0 {
            debug!(stream = %self.stream_id, ?stats, last_block = ?cursor.last_block, "Batch processed");
        }
        Ok(stats)
    }

    /// Poll until the source has nothing new.
    pub async fn run_until_idle(&self) -> Result<PollStats, StreamError> {
        let mut cursor = self.load_cursor().await?;
        let mut total = PollStats::default();
        loop {
            let stats = self.poll_once(&mut cursor).await?;
            total.merge(stats);
            if stats.fetched == 0 {
                return Ok(total);
            }
        }
    }

    /// Run forever. Returns only on a permanent failure.
    pub async fn run(&self) -> Result<(), StreamError> {
        let mut cursor = self.load_cursor().await?;
        info!(
            stream = %self.stream_id,
            last_block = ?cursor.last_block,
            last_event = ?cursor.last_event_key,
            "Stream starting"
        );

        loop {
            let stats = self.poll_once(&mut cursor).await?;
            if stats.fetched < self.batch_size {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
    }

    async fn fetch_with_retry(&self, cursor: &StreamCursor) -> Result<Vec<ChainEvent>, StreamError> {
        let events = retry(self.backoff(), || async {
            self.source
                .fetch_after(cursor, self.batch_size)
                .await
                .map_err(|e| {
                    warn!(stream = %self.stream_id, error = %e, "Event source failed, retrying");
                    backoff::Error::transient(e)
                })
        })
        .await?;
        Ok(events)
    }

    async fn apply_with_retry(&self, event: &ChainEvent) -> Result<Outcome, StreamError> {
        let outcome = retry(self.backoff(), || async {
            self.projector.apply(event).await.map_err(|e| {
                if is_permanent(&e) {
                    backoff::Error::permanent(e)
                } else {
                    warn!(stream = %self.stream_id, event_key = %event.event_key(), error = %e, "Projection failed, retrying event");
                    backoff::Error::transient(e)
                }
            })
        })
        .await?;
        Ok(outcome)
    }

    async fn store_cursor_with_retry(&self, cursor: &StreamCursor) -> Result<(), StreamError> {
        retry(self.backoff(), || async {
            self.projector
                .store()
                .store_cursor(cursor)
                .await
                .map_err(|e| {
                    warn!(stream = %self.stream_id, error = %e, "Cursor write failed, retrying");
                    backoff::Error::transient(e)
                })
        })
        .await?;
        Ok(())
    }
}

/// A corrupt stored entity will not heal by retrying.
fn is_permanent(err: &ProjectionError) -> bool {
    matches!(err, ProjectionError::Store(StoreError::Corrupt { .. }))
}
