//! In-memory entity store for tests and dry runs.

use super::{EntityStore, EntityWrite, StoreError, StreamCursor};
use crate::domain::{EntityKind, EventMeta};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    entities: HashMap<(EntityKind, String), String>,
    applied: HashSet<String>,
    cursors: HashMap<String, StreamCursor>,
}

/// Entity store backed by process memory. Same commit semantics as SQLite.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw body, bypassing the idempotency ledger.
    pub fn insert_raw(&self, kind: EntityKind, id: &str, body: &str) {
        let mut inner = self.lock();
        inner
            .entities
            .insert((kind, id.to_string()), body.to_string());
    }

    /// Number of stored entities of a kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.lock()
            .entities
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Sorted ids of stored entities of a kind.
    pub fn ids(&self, kind: EntityKind) -> Vec<String> {
        let mut ids: Vec<String> = self
            .lock()
            .entities
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-write; the data is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn load_raw(&self, kind: EntityKind, id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock().entities.get(&(kind, id.to_string())).cloned())
    }

    async fn is_applied(&self, event_key: &str) -> Result<bool, StoreError> {
        Ok(self.lock().applied.contains(event_key))
    }

    async fn commit(&self, meta: &EventMeta, writes: &[EntityWrite]) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        if !inner.applied.insert(meta.event_key()) {
            return Ok(false);
        }
        for write in writes {
            inner
                .entities
                .insert((write.kind, write.id.clone()), write.body.clone());
        }
        Ok(true)
    }

    async fn load_cursor(&self, stream_id: &str) -> Result<Option<StreamCursor>, StoreError> {
        Ok(self.lock().cursors.get(stream_id).cloned())
    }

    async fn store_cursor(&self, cursor: &StreamCursor) -> Result<(), StoreError> {
        self.lock()
            .cursors
            .insert(cursor.stream_id.clone(), cursor.clone());
        Ok(())
    }

    async fn list_cursors(&self) -> Result<Vec<StreamCursor>, StoreError> {
        let mut cursors: Vec<StreamCursor> = self.lock().cursors.values().cloned().collect();
        cursors.sort_by(|a, b| a.stream_id.cmp(&b.stream_id));
        Ok(cursors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cursor_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load_cursor("1").await.unwrap().is_none());

        let cursor = StreamCursor::with_watermark("1", 7, 1, "1:0x07-1".to_string());
        store.store_cursor(&cursor).await.unwrap();
        assert_eq!(store.load_cursor("1").await.unwrap(), Some(cursor));
        assert_eq!(store.list_cursors().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ids_are_scoped_by_kind() {
        let store = MemoryStore::new();
        store.insert_raw(EntityKind::Account, "0xb", "{}");
        store.insert_raw(EntityKind::Account, "0xa", "{}");
        store.insert_raw(EntityKind::Pool, "0x01", "{}");

        assert_eq!(store.ids(EntityKind::Account), vec!["0xa", "0xb"]);
        assert_eq!(store.count(EntityKind::Pool), 1);
    }
}
