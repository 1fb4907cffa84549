pub mod api;
pub mod chain;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod source;
pub mod store;

pub use chain::{ChainReadError, ChainReader, MockChainReader, RpcChainReader};
pub use config::{Config, StreamConfig};
pub use db::{init_db, Repository};
pub use domain::{Address, Amount, ChainEvent, ChainId, EntityKind, EventMeta, EventPayload};
pub use engine::{ApplyLock, Outcome, ProjectionError, ProjectionSettings, Projector, SkipReason};
pub use error::AppError;
pub use orchestration::{StreamError, StreamRunner};
pub use source::{EventSource, FileEventSource, MockEventSource};
pub use store::{EntityStore, MemoryStore, StreamCursor};
