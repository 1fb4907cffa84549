//! Keyed entity store abstraction.
//!
//! Handlers see pure key-value semantics: load by id (nullable) and upsert.
//! Writes produced while handling one event are buffered in a [`Changeset`]
//! and committed together with the event's idempotency key, so a replayed
//! event is rejected before any of its writes land.

use crate::domain::{Entity, EntityKind, EventMeta};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub mod cursor;
pub mod memory;

pub use cursor::StreamCursor;
pub use memory::MemoryStore;

/// One serialized upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityWrite {
    pub kind: EntityKind,
    pub id: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("corrupt {kind} entity {id}: {reason}")]
    Corrupt {
        kind: EntityKind,
        id: String,
        reason: String,
    },
}

/// Durable keyed storage for derived entities.
#[async_trait]
pub trait EntityStore: Send + Sync + fmt::Debug {
    /// Load the JSON body of an entity, if present.
    async fn load_raw(&self, kind: EntityKind, id: &str) -> Result<Option<String>, StoreError>;

    /// Whether an event with this idempotency key has already been committed.
    async fn is_applied(&self, event_key: &str) -> Result<bool, StoreError>;

    /// Record the event key and upsert all writes atomically.
    ///
    /// Returns `false` (and writes nothing) if the key was already applied.
    async fn commit(&self, meta: &EventMeta, writes: &[EntityWrite]) -> Result<bool, StoreError>;

    async fn load_cursor(&self, stream_id: &str) -> Result<Option<StreamCursor>, StoreError>;

    async fn store_cursor(&self, cursor: &StreamCursor) -> Result<(), StoreError>;

    async fn list_cursors(&self) -> Result<Vec<StreamCursor>, StoreError>;
}

impl<'s> dyn EntityStore + 's {
    /// Typed load.
    pub async fn load<T: Entity>(&self, id: &str) -> Result<Option<T>, StoreError> {
        match self.load_raw(T::KIND, id).await? {
            Some(body) => decode::<T>(id, &body).map(Some),
            None => Ok(None),
        }
    }
}

fn decode<T: Entity>(id: &str, body: &str) -> Result<T, StoreError> {
    serde_json::from_str(body).map_err(|e| StoreError::Corrupt {
        kind: T::KIND,
        id: id.to_string(),
        reason: e.to_string(),
    })
}

/// Unit of work for a single event: reads see earlier writes of the same event.
pub struct Changeset<'a> {
    store: &'a dyn EntityStore,
    pending: BTreeMap<(EntityKind, String), String>,
}

impl<'a> Changeset<'a> {
    pub fn new(store: &'a dyn EntityStore) -> Self {
        Self {
            store,
            pending: BTreeMap::new(),
        }
    }

    pub async fn load<T: Entity>(&self, id: &str) -> Result<Option<T>, StoreError> {
        if let Some(body) = self.pending.get(&(T::KIND, id.to_string())) {
            return decode::<T>(id, body).map(Some);
        }
        self.store.load::<T>(id).await
    }

    pub async fn exists<T: Entity>(&self, id: &str) -> Result<bool, StoreError> {
        if self.pending.contains_key(&(T::KIND, id.to_string())) {
            return Ok(true);
        }
        Ok(self.store.load_raw(T::KIND, id).await?.is_some())
    }

    pub fn save<T: Entity>(&mut self, entity: &T) -> Result<(), StoreError> {
        let body = serde_json::to_string(entity)?;
        self.pending.insert((T::KIND, entity.id()), body);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn into_writes(self) -> Vec<EntityWrite> {
        self.pending
            .into_iter()
            .map(|((kind, id), body)| EntityWrite { kind, id, body })
            .collect()
    }
}
