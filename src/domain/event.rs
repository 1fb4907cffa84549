//! Decoded chain events as delivered to the projector.

use crate::domain::{Address, Amount, ChainId, PoolId, Timestamp, TxHash};
use serde::{Deserialize, Serialize};

/// Block/transaction provenance attached to every log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    pub chain_id: ChainId,
    /// Emitting contract.
    pub contract: Address,
    pub block_number: u64,
    pub block_timestamp: Timestamp,
    pub tx_hash: TxHash,
    pub log_index: u64,
}

impl EventMeta {
    /// Idempotency key: `{chainId}:{txHash}-{logIndex}`.
    pub fn event_key(&self) -> String {
        format!("{}:{}-{}", self.chain_id, self.tx_hash, self.log_index)
    }

    /// `{txHash}-{logIndex}`, the per-leg id of NFT bridge requests.
    pub fn log_id(&self) -> String {
        format!("{}-{}", self.tx_hash, self.log_index)
    }
}

/// One decoded log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEvent {
    pub meta: EventMeta,
    pub payload: EventPayload,
}

impl ChainEvent {
    pub fn new(meta: EventMeta, payload: EventPayload) -> Self {
        Self { meta, payload }
    }

    pub fn event_key(&self) -> String {
        self.meta.event_key()
    }

    pub fn name(&self) -> &'static str {
        self.payload.name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "params")]
pub enum EventPayload {
    Deposit(DepositParams),
    CuratorDeposit(DepositParams),
    PublicDeposit(DepositParams),
    Withdraw(WithdrawParams),
    Transfer(TransferParams),
    AllocationSetup(AllocationSetupParams),
    AllocationBatchSetup(AllocationBatchSetupParams),
    UserBalanceUpdated(UserBalanceUpdatedParams),
    CuratorUpdated(CuratorUpdatedParams),
    CuratorDeployed(CuratorDeployedParams),
    PoolCreated(PoolCreatedParams),
    PoolRateUpdated(PoolRateUpdatedParams),
    TokensBridged(TokensBridgedParams),
    TokensReceived(TokensReceivedParams),
    TokenLocked(NftOutboundParams),
    TokenBurned(NftOutboundParams),
    TokenMinted(NftInboundParams),
    TokenUnlocked(NftInboundParams),
}

impl EventPayload {
    pub fn name(&self) -> &'static str {
        match self {
            EventPayload::Deposit(_) => "Deposit",
            EventPayload::CuratorDeposit(_) => "CuratorDeposit",
            EventPayload::PublicDeposit(_) => "PublicDeposit",
            EventPayload::Withdraw(_) => "Withdraw",
            EventPayload::Transfer(_) => "Transfer",
            EventPayload::AllocationSetup(_) => "AllocationSetup",
            EventPayload::AllocationBatchSetup(_) => "AllocationBatchSetup",
            EventPayload::UserBalanceUpdated(_) => "UserBalanceUpdated",
            EventPayload::CuratorUpdated(_) => "CuratorUpdated",
            EventPayload::CuratorDeployed(_) => "CuratorDeployed",
            EventPayload::PoolCreated(_) => "PoolCreated",
            EventPayload::PoolRateUpdated(_) => "PoolRateUpdated",
            EventPayload::TokensBridged(_) => "TokensBridged",
            EventPayload::TokensReceived(_) => "TokensReceived",
            EventPayload::TokenLocked(_) => "TokenLocked",
            EventPayload::TokenBurned(_) => "TokenBurned",
            EventPayload::TokenMinted(_) => "TokenMinted",
            EventPayload::TokenUnlocked(_) => "TokenUnlocked",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositParams {
    pub sender: Address,
    /// Beneficiary receiving the shares.
    pub owner: Address,
    pub assets: Amount,
    pub shares: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawParams {
    pub sender: Address,
    pub receiver: Address,
    pub owner: Address,
    pub assets: Amount,
    pub shares: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferParams {
    pub from: Address,
    pub to: Address,
    pub value: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSetupParams {
    pub pool_id: PoolId,
    pub allocation: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationBatchSetupParams {
    pub pool_ids: Vec<PoolId>,
    pub allocations: Vec<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBalanceUpdatedParams {
    pub user: Address,
    pub balance: Amount,
    pub total_deposited: Amount,
    pub total_withdrawn: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuratorUpdatedParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub performance_fee: Option<Amount>,
    #[serde(default)]
    pub fee_recipient: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuratorDeployedParams {
    pub curator: Address,
    pub asset: Address,
    pub name: String,
    pub symbol: String,
    pub creator: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolCreatedParams {
    pub pool_id: PoolId,
    pub loan_token: Address,
    pub collateral_token: Address,
    pub creator: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRateUpdatedParams {
    pub pool_id: PoolId,
    pub lending_rate: Amount,
    pub borrow_rate: Amount,
    pub utilization: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokensBridgedParams {
    pub message_id: String,
    pub token: Address,
    pub amount: Amount,
    pub sender: Address,
    pub receiver: Address,
    pub dest_chain_selector: u64,
    #[serde(default)]
    pub fees: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokensReceivedParams {
    pub message_id: String,
    pub token: Address,
    pub amount: Amount,
    pub receiver: Address,
    pub source_chain_selector: u64,
}

/// TokenLocked / TokenBurned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftOutboundParams {
    pub token: Address,
    pub token_id: Amount,
    pub user: Address,
    pub target_chain_id: ChainId,
}

/// TokenMinted / TokenUnlocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftInboundParams {
    pub token: Address,
    pub token_id: Amount,
    pub user: Address,
    pub source_chain_id: ChainId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_key_includes_chain_tx_and_log_index() {
        let meta = EventMeta {
            chain_id: ChainId(1),
            contract: Address::new("0xvault"),
            block_number: 10,
            block_timestamp: Timestamp::new(1_700_000_000),
            tx_hash: TxHash::new("0xABC"),
            log_index: 3,
        };
        assert_eq!(meta.event_key(), "1:0xabc-3");
        assert_eq!(meta.log_id(), "0xabc-3");
    }

    #[test]
    fn test_decode_deposit_from_json() {
        let json = r#"{
            "meta": {
                "chainId": 8453,
                "contract": "0xVAULT",
                "blockNumber": 12,
                "blockTimestamp": 1700000000,
                "txHash": "0xdead",
                "logIndex": 0
            },
            "payload": {
                "event": "CuratorDeposit",
                "params": {
                    "sender": "0xA",
                    "owner": "0xB",
                    "assets": "1000",
                    "shares": "990"
                }
            }
        }"#;

        let event: ChainEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.name(), "CuratorDeposit");
        assert_eq!(event.meta.contract.as_str(), "0xvault");
        match event.payload {
            EventPayload::CuratorDeposit(params) => {
                assert_eq!(params.owner.as_str(), "0xb");
                assert_eq!(params.assets, Amount::from_u64(1000));
                assert_eq!(params.shares, Amount::from_u64(990));
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }
}
