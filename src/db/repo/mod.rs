//! Repository layer for database operations.
//!
//! `Repository` is the SQLite implementation of [`EntityStore`]. Entities are
//! stored as JSON bodies keyed by `(kind, id)`; the idempotency ledger and the
//! per-stream cursors live in their own tables.

use crate::domain::{EntityKind, EventMeta};
use crate::store::{EntityStore, EntityWrite, StoreError, StreamCursor};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::debug;

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Number of stored entities of a kind.
    pub async fn count_entities(&self, kind: EntityKind) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM entities WHERE kind = ?")
            .bind(kind.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Number of events recorded in the idempotency ledger for a chain.
    pub async fn count_applied_events(&self, chain_id: u64) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM applied_events WHERE chain_id = ?")
            .bind(chain_id as i64)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    fn cursor_from_row(row: &SqliteRow) -> StreamCursor {
        let last_block: Option<i64> = row.get("last_block");
        let last_log_index: Option<i64> = row.get("last_log_index");
        StreamCursor {
            stream_id: row.get("stream_id"),
            last_block: last_block.map(|b| b as u64),
            last_log_index: last_log_index.map(|i| i as u64),
            last_event_key: row.get("last_event_key"),
        }
    }
}

#[async_trait]
impl EntityStore for Repository {
    async fn load_raw(&self, kind: EntityKind, id: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT body FROM entities WHERE kind = ? AND id = ?")
            .bind(kind.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("body")))
    }

    async fn is_applied(&self, event_key: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM applied_events WHERE event_key = ?")
            .bind(event_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Record the event key and upsert every write in one transaction.
    ///
    /// The ledger insert happens first; if the key already exists the
    /// transaction is rolled back untouched.
    async fn commit(&self, meta: &EventMeta, writes: &[EntityWrite]) -> Result<bool, StoreError> {
        let event_key = meta.event_key();
        let now = chrono::Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO applied_events (event_key, chain_id, block_number, applied_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(event_key) DO NOTHING
            "#,
        )
        .bind(&event_key)
        .bind(meta.chain_id.0 as i64)
        .bind(meta.block_number as i64)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            debug!(event_key = %event_key, "Event already applied, skipping commit");
            return Ok(false);
        }

        for write in writes {
            sqlx::query(
                r#"
                INSERT INTO entities (kind, id, body, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(kind, id) DO UPDATE SET
                    body = excluded.body,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(write.kind.as_str())
            .bind(&write.id)
            .bind(&write.body)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn load_cursor(&self, stream_id: &str) -> Result<Option<StreamCursor>, StoreError> {
        let row = sqlx::query(
            "SELECT stream_id, last_block, last_log_index, last_event_key FROM stream_cursors WHERE stream_id = ?",
        )
        .bind(stream_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::cursor_from_row))
    }

    async fn store_cursor(&self, cursor: &StreamCursor) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO stream_cursors (stream_id, last_block, last_log_index, last_event_key, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(stream_id) DO UPDATE SET
                last_block = excluded.last_block,
                last_log_index = excluded.last_log_index,
                last_event_key = excluded.last_event_key,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&cursor.stream_id)
        .bind(cursor.last_block.map(|b| b as i64))
        .bind(cursor.last_log_index.map(|i| i as i64))
        .bind(cursor.last_event_key.as_deref())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_cursors(&self) -> Result<Vec<StreamCursor>, StoreError> {
        let rows = sqlx::query(
            "SELECT stream_id, last_block, last_log_index, last_event_key FROM stream_cursors ORDER BY stream_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::cursor_from_row).collect())
    }
}
