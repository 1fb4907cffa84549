//! Event-driven state projection.
//!
//! The [`Projector`] folds decoded chain events into the derived entity graph.
//! Every event is handled against a [`Changeset`]; its writes and its
//! idempotency key are committed together, so replaying a delivered event is
//! a no-op.

use crate::chain::ChainReader;
use crate::domain::{Account, Address, ChainEvent, ChainId, EventMeta, EventPayload, Timestamp};
use crate::store::{Changeset, EntityStore, StoreError};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub mod allocation;
pub mod apr;
pub mod bridge;
pub mod nft_bridge;
pub mod vault;

pub use apr::WeightedApr;
pub use nft_bridge::{NftInboundKind, NftOutboundKind};

/// Per-stream projection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionSettings {
    /// Cross-chain protocol selector of the chain this stream indexes.
    pub chain_selector: u64,
    /// Chain that holds the original NFT collection, if any.
    pub nft_home_chain: Option<ChainId>,
    /// Seconds before an outbound NFT leg is considered expired.
    pub nft_expiration_window_secs: i64,
    /// Maximum distance between NFT legs that may pair.
    pub nft_correlation_window_secs: u64,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            chain_selector: 0,
            nft_home_chain: None,
            nft_expiration_window_secs: 86_400,
            nft_correlation_window_secs: 3_600,
        }
    }
}

/// Why a handler consumed an event without applying its main transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingCurator,
    MissingPool,
    MissingBalance,
    /// Transfer to or from the zero address.
    MintOrBurn,
    AlreadyExists,
    AlreadyCompleted,
    MalformedEvent,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::MissingCurator => "missing curator",
            SkipReason::MissingPool => "missing pool",
            SkipReason::MissingBalance => "missing balance",
            SkipReason::MintOrBurn => "mint or burn transfer",
            SkipReason::AlreadyExists => "already exists",
            SkipReason::AlreadyCompleted => "already completed",
            SkipReason::MalformedEvent => "malformed event",
        };
        write!(f, "{}", s)
    }
}

/// Result of applying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The transition ran; `writes` entities were upserted.
    Applied { writes: usize },
    /// The event was consumed without its main transition. Side writes, if
    /// any, were still committed.
    Skipped(SkipReason),
    /// The idempotency key was already recorded; nothing was written.
    Duplicate,
}

impl Outcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Outcome::Duplicate)
    }
}

/// Infrastructure failure. The caller retries the same event.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Handler return type before the commit step.
pub(crate) type Handled = Result<Outcome, ProjectionError>;

/// Serializes read-modify-write cycles of projectors sharing one store.
///
/// Handlers read entities through a [`Changeset`] and commit later; two streams
/// touching the same key (both legs of a bridge message) must not interleave.
pub type ApplyLock = Arc<Mutex<()>>;

/// Applies chain events to the entity store.
#[derive(Debug, Clone)]
pub struct Projector {
    store: Arc<dyn EntityStore>,
    chain: Arc<dyn ChainReader>,
    settings: ProjectionSettings,
    apply_lock: ApplyLock,
}

impl Projector {
    pub fn new(
        store: Arc<dyn EntityStore>,
        chain: Arc<dyn ChainReader>,
        settings: ProjectionSettings,
    ) -> Self {
        Self {
            store,
            chain,
            settings,
            apply_lock: ApplyLock::default(),
        }
    }

    /// Share the apply lock with every other projector writing to the same store.
    pub fn with_apply_lock(mut self, lock: ApplyLock) -> Self {
        self.apply_lock = lock;
        self
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn settings(&self) -> &ProjectionSettings {
        &self.settings
    }

    /// Apply one event exactly once.
    pub async fn apply(&self, event: &ChainEvent) -> Result<Outcome, ProjectionError> {
        let _guard = self.apply_lock.lock().await;
        let event_key = event.event_key();
        if self.store.is_applied(&event_key).await? {
            debug!(event_key = %event_key, event = event.name(), "Duplicate event, skipping");
            return Ok(Outcome::Duplicate);
        }

        let mut changes = Changeset::new(self.store.as_ref());
        let outcome = self.dispatch(event, &mut changes).await?;
        let writes = changes.into_writes();

        if !self.store.commit(&event.meta, &writes).await? {
            debug!(event_key = %event_key, "Event committed concurrently, skipping");
            return Ok(Outcome::Duplicate);
        }

        match outcome {
            Outcome::Applied { .. } => {
                debug!(event_key = %event_key, event = event.name(), writes = writes.len(), "Event applied");
                Ok(Outcome::Applied {
                    writes: writes.len(),
                })
            }
            other => {
                info!(event_key = %event_key, event = event.name(), outcome = ?other, "Event consumed without transition");
                Ok(other)
            }
        }
    }

    async fn dispatch(&self, event: &ChainEvent, changes: &mut Changeset<'_>) -> Handled {
        let meta = &event.meta;
        match &event.payload {
            EventPayload::Deposit(p)
            | EventPayload::CuratorDeposit(p)
            | EventPayload::PublicDeposit(p) => self.on_deposit(meta, p, changes).await,
            EventPayload::Withdraw(p) => self.on_withdraw(meta, p, changes).await,
            EventPayload::Transfer(p) => self.on_transfer(meta, p, changes).await,
            EventPayload::UserBalanceUpdated(p) => {
                self.on_user_balance_updated(meta, p, changes).await
            }
            EventPayload::CuratorUpdated(p) => self.on_curator_updated(meta, p, changes).await,
            EventPayload::CuratorDeployed(p) => self.on_curator_deployed(meta, p, changes).await,
            EventPayload::AllocationSetup(p) => self.on_allocation_setup(meta, p, changes).await,
            EventPayload::AllocationBatchSetup(p) => {
                self.on_allocation_batch_setup(meta, p, changes).await
            }
            EventPayload::PoolCreated(p) => self.on_pool_created(meta, p, changes).await,
            EventPayload::PoolRateUpdated(p) => self.on_pool_rate_updated(meta, p, changes).await,
            EventPayload::TokensBridged(p) => self.on_tokens_bridged(meta, p, changes).await,
            EventPayload::TokensReceived(p) => self.on_tokens_received(meta, p, changes).await,
            EventPayload::TokenLocked(p) => {
                self.on_nft_outbound(meta, NftOutboundKind::Locked, p, changes).await
            }
            EventPayload::TokenBurned(p) => {
                self.on_nft_outbound(meta, NftOutboundKind::Burned, p, changes).await
            }
            EventPayload::TokenMinted(p) => {
                self.on_nft_inbound(meta, NftInboundKind::Minted, p, changes).await
            }
            EventPayload::TokenUnlocked(p) => {
                self.on_nft_inbound(meta, NftInboundKind::Unlocked, p, changes).await
            }
        }
    }
}

/// Load an account, creating it on first sight.
pub(crate) async fn load_or_create_account(
    changes: &Changeset<'_>,
    id: &Address,
    at: Timestamp,
) -> Result<Account, StoreError> {
    Ok(changes
        .load::<Account>(id.as_str())
        .await?
        .unwrap_or_else(|| Account::new(id.clone(), at)))
}

/// Number of entities staged so far, reported on a successful transition.
pub(crate) fn applied(changes: &Changeset<'_>) -> Handled {
    Ok(Outcome::Applied {
        writes: changes.len(),
    })
}

pub(crate) fn skipped(reason: SkipReason) -> Handled {
    Ok(Outcome::Skipped(reason))
}

/// Shorthand used in handler log fields.
pub(crate) fn key_of(meta: &EventMeta) -> String {
    meta.event_key()
}
