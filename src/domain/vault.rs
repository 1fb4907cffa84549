//! Curator/vault entities: Balance, Curator, Pool, PoolAllocation, CuratorLendApr.

use crate::domain::{Address, Amount, Entity, EntityKind, EventMeta, PoolId, Timestamp, TxHash};
use serde::{Deserialize, Serialize};

/// Block/transaction a derived value was computed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub block_number: u64,
    pub block_timestamp: Timestamp,
    pub tx_hash: TxHash,
    pub log_index: u64,
}

impl From<&EventMeta> for Provenance {
    fn from(meta: &EventMeta) -> Self {
        Self {
            block_number: meta.block_number,
            block_timestamp: meta.block_timestamp,
            tx_hash: meta.tx_hash.clone(),
            log_index: meta.log_index,
        }
    }
}

/// Per-(vault, account) position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub vault: Address,
    pub account: Address,
    pub balance: Amount,
    pub shares: Amount,
    pub total_deposited: Amount,
    pub total_withdrawn: Amount,
    pub updated_at: Timestamp,
}

impl Balance {
    pub fn key(vault: &Address, account: &Address) -> String {
        format!("{}-{}", vault, account)
    }

    pub fn new(vault: Address, account: Address, at: Timestamp) -> Self {
        Self {
            vault,
            account,
            balance: Amount::ZERO,
            shares: Amount::ZERO,
            total_deposited: Amount::ZERO,
            total_withdrawn: Amount::ZERO,
            updated_at: at,
        }
    }
}

impl Entity for Balance {
    const KIND: EntityKind = EntityKind::Balance;

    fn id(&self) -> String {
        Balance::key(&self.vault, &self.account)
    }
}

/// A curator vault allocating deposits across lending pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Curator {
    pub id: Address,
    pub asset: Address,
    pub name: String,
    pub symbol: String,
    pub creator: Address,
    #[serde(default)]
    pub performance_fee: Option<Amount>,
    #[serde(default)]
    pub fee_recipient: Option<Address>,
    pub total_assets: Amount,
    pub total_shares: Amount,
    /// Ordered set of allocated pools.
    pub pools: Vec<PoolId>,
    /// Raw allocation array from the last batch setup, kept verbatim.
    pub allocations: Vec<Amount>,
    pub current_lend_apr: Amount,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Curator {
    pub fn new(
        id: Address,
        asset: Address,
        name: String,
        symbol: String,
        creator: Address,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            asset,
            name,
            symbol,
            creator,
            performance_fee: None,
            fee_recipient: None,
            total_assets: Amount::ZERO,
            total_shares: Amount::ZERO,
            pools: Vec::new(),
            allocations: Vec::new(),
            current_lend_apr: Amount::ZERO,
            created_at,
            updated_at: created_at,
        }
    }

    /// Idempotent insert preserving order. Returns true when added.
    pub fn add_pool(&mut self, pool: &PoolId) -> bool {
        if self.pools.contains(pool) {
            false
        } else {
            self.pools.push(pool.clone());
            true
        }
    }
}

impl Entity for Curator {
    const KIND: EntityKind = EntityKind::Curator;

    fn id(&self) -> String {
        self.id.as_str().to_string()
    }
}

/// A single loan/collateral lending market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub id: PoolId,
    pub loan_token: Address,
    pub collateral_token: Address,
    pub creator: Address,
    pub lending_rate: Amount,
    pub borrow_rate: Amount,
    pub utilization: Amount,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Entity for Pool {
    const KIND: EntityKind = EntityKind::Pool;

    fn id(&self) -> String {
        self.id.as_str().to_string()
    }
}

/// Point-in-time allocation of a curator to a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolAllocation {
    pub curator: Address,
    pub pool: PoolId,
    pub allocation: Amount,
    /// Basis points of curator `totalAssets` at write time.
    pub allocation_percentage: Amount,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PoolAllocation {
    pub fn key(curator: &Address, pool: &PoolId) -> String {
        format!("{}-{}", curator, pool)
    }

    /// Create or refresh an allocation record against the curator's current totals.
    pub fn upsert(
        existing: Option<PoolAllocation>,
        curator: &Curator,
        pool: &PoolId,
        allocation: Amount,
        at: Timestamp,
    ) -> PoolAllocation {
        let created_at = existing.map(|e| e.created_at).unwrap_or(at);
        PoolAllocation {
            curator: curator.id.clone(),
            pool: pool.clone(),
            allocation,
            allocation_percentage: allocation.basis_points_of(curator.total_assets),
            is_active: !allocation.is_zero(),
            created_at,
            updated_at: at,
        }
    }
}

impl Entity for PoolAllocation {
    const KIND: EntityKind = EntityKind::PoolAllocation;

    fn id(&self) -> String {
        PoolAllocation::key(&self.curator, &self.pool)
    }
}

/// Immutable lend-APR time-series point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuratorLendApr {
    pub id: String,
    pub curator: Address,
    pub apr: Amount,
    pub total_allocated: Amount,
    pub provenance: Provenance,
}

impl CuratorLendApr {
    pub fn key(curator: &Address, at: Timestamp) -> String {
        format!("{}-lend-{}", curator, at)
    }

    /// Fallback key when a snapshot for the same block timestamp already exists.
    ///
    /// Several blocks can share a timestamp, so the block number is part of the key.
    pub fn disambiguated_key(
        curator: &Address,
        at: Timestamp,
        block_number: u64,
        log_index: u64,
    ) -> String {
        format!("{}-lend-{}-{}-{}", curator, at, block_number, log_index)
    }
}

impl Entity for CuratorLendApr {
    const KIND: EntityKind = EntityKind::CuratorLendApr;

    fn id(&self) -> String {
        self.id.clone()
    }
}
