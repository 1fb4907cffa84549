#![allow(dead_code)]

use std::sync::Arc;
use vaultgraph::domain::{
    Address, Amount, ChainEvent, ChainId, CuratorDeployedParams, DepositParams, EventMeta,
    EventPayload, PoolCreatedParams, PoolId, PoolRateUpdatedParams, Timestamp, TxHash,
    WithdrawParams,
};
use vaultgraph::engine::{ProjectionSettings, Projector};
use vaultgraph::{EntityStore, MemoryStore, MockChainReader};

pub const CHAIN: u64 = 8453;
pub const FACTORY: &str = "0xfac0000000000000000000000000000000000001";
pub const VAULT: &str = "0xa000000000000000000000000000000000000001";
pub const ALICE: &str = "0xa11ce00000000000000000000000000000000001";
pub const BOB: &str = "0xb0b0000000000000000000000000000000000002";
pub const USDC: &str = "0x0000000000000000000000000000000000005dc0";
pub const P1: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";
pub const P2: &str = "0x0000000000000000000000000000000000000000000000000000000000000002";

pub fn addr(s: &str) -> Address {
    Address::new(s)
}

pub fn amt(v: u64) -> Amount {
    Amount::from_u64(v)
}

/// Block `b` on `CHAIN`, timestamped `b * 12`.
pub fn event(contract: &str, block: u64, log_index: u64, payload: EventPayload) -> ChainEvent {
    event_on(CHAIN, contract, block, block as i64 * 12, log_index, payload)
}

pub fn event_on(
    chain: u64,
    contract: &str,
    block: u64,
    timestamp: i64,
    log_index: u64,
    payload: EventPayload,
) -> ChainEvent {
    ChainEvent::new(
        EventMeta {
            chain_id: ChainId(chain),
            contract: Address::new(contract),
            block_number: block,
            block_timestamp: Timestamp::new(timestamp),
            tx_hash: TxHash::new(format!("0x{:016x}{:048x}", chain, block)),
            log_index,
        },
        payload,
    )
}

pub fn deployed(curator: &str) -> EventPayload {
    EventPayload::CuratorDeployed(CuratorDeployedParams {
        curator: addr(curator),
        asset: addr(USDC),
        name: "Prime USDC".to_string(),
        symbol: "pUSDC".to_string(),
        creator: addr(ALICE),
    })
}

pub fn pool_created(pool: &str) -> EventPayload {
    EventPayload::PoolCreated(PoolCreatedParams {
        pool_id: PoolId::new(pool),
        loan_token: addr(USDC),
        collateral_token: addr("0x00000000000000000000000000000000000000e7"),
        creator: addr(BOB),
    })
}

pub fn rate(pool: &str, lending_rate: u64) -> EventPayload {
    EventPayload::PoolRateUpdated(PoolRateUpdatedParams {
        pool_id: PoolId::new(pool),
        lending_rate: amt(lending_rate),
        borrow_rate: amt(lending_rate * 2),
        utilization: amt(5000),
    })
}

pub fn deposit(owner: &str, assets: u64, shares: u64) -> EventPayload {
    EventPayload::Deposit(DepositParams {
        sender: addr(owner),
        owner: addr(owner),
        assets: amt(assets),
        shares: amt(shares),
    })
}

pub fn withdraw(owner: &str, assets: u64, shares: u64) -> EventPayload {
    EventPayload::Withdraw(WithdrawParams {
        sender: addr(owner),
        receiver: addr(owner),
        owner: addr(owner),
        assets: amt(assets),
        shares: amt(shares),
    })
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub chain: Arc<MockChainReader>,
    pub projector: Projector,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(ProjectionSettings {
            chain_selector: 15_971_525_489_660_198_786,
            ..ProjectionSettings::default()
        })
    }

    pub fn with_settings(settings: ProjectionSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let chain = Arc::new(MockChainReader::new());
        let projector = Projector::new(store.clone(), chain.clone(), settings);
        Self {
            store,
            chain,
            projector,
        }
    }

    pub fn dyn_store(&self) -> &dyn EntityStore {
        self.store.as_ref()
    }
}
