//! Domain types for the projection engine.
//!
//! This module provides:
//! - Lossless 256-bit amounts
//! - Primitives: Address, TxHash, PoolId, ChainId, Timestamp
//! - Decoded chain events with block/tx provenance
//! - The derived entities persisted in the keyed store

pub mod account;
pub mod amount;
pub mod bridge;
pub mod entity;
pub mod event;
pub mod nft_bridge;
pub mod primitives;
pub mod vault;

pub use account::Account;
pub use amount::{Amount, AmountParseError, Underflow};
pub use bridge::{BridgeStatus, BridgeTransaction};
pub use entity::{Entity, EntityKind};
pub use event::{
    AllocationBatchSetupParams, AllocationSetupParams, ChainEvent, CuratorDeployedParams,
    CuratorUpdatedParams, DepositParams, EventMeta, EventPayload, NftInboundParams,
    NftOutboundParams, PoolCreatedParams, PoolRateUpdatedParams, TokensBridgedParams,
    TokensReceivedParams, TransferParams, UserBalanceUpdatedParams, WithdrawParams,
};
pub use nft_bridge::{
    cross_chain_tx_hash, BridgeCorrelation, BridgeType, CorrelatedLeg, Direction,
    Erc721BridgeRequest, Erc721BridgeTransaction, NftBridgeStatus,
};
pub use primitives::{Address, AddressParseError, ChainId, PoolId, Timestamp, TxHash};
pub use vault::{Balance, Curator, CuratorLendApr, Pool, PoolAllocation, Provenance};
