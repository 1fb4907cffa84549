//! ERC-721 bridge entities and the derived cross-chain correlation key.

use crate::domain::{Address, Amount, ChainId, Entity, EntityKind, Timestamp, TxHash};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NftBridgeStatus {
    Initiated,
    Completed,
    /// Only set by an external reconciliation job.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeType {
    LockMint,
    BurnMint,
    BurnUnlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Outbound,
    Inbound,
}

/// Deterministic pairing key shared by both legs of one NFT bridge operation.
///
/// Layout: `0x || token || tokenId (32 bytes) || user || sourceChainId (8 bytes) || destChainId (8 bytes)`.
pub fn cross_chain_tx_hash(
    token: &Address,
    token_id: Amount,
    user: &Address,
    source_chain: ChainId,
    dest_chain: ChainId,
) -> String {
    format!(
        "0x{}{}{}{:016x}{:016x}",
        token.hex_digits(),
        hex::encode(token_id.inner().to_be_bytes::<32>()),
        user.hex_digits(),
        source_chain.0,
        dest_chain.0
    )
}

/// One observed leg (lock/burn outbound, or mint/unlock inbound).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc721BridgeRequest {
    /// `{txHash}-{logIndex}`.
    pub id: String,
    pub direction: Direction,
    pub bridge_type: BridgeType,
    pub status: NftBridgeStatus,
    pub token: Address,
    pub token_id: Amount,
    pub user: Address,
    pub source_chain_id: ChainId,
    pub dest_chain_id: ChainId,
    pub cross_chain_tx_hash: String,
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub created_at: Timestamp,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
    /// Id of the paired leg once correlated.
    #[serde(default)]
    pub counterpart_request: Option<String>,
    #[serde(default)]
    pub counterpart_tx: Option<TxHash>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl Erc721BridgeRequest {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.status == NftBridgeStatus::Initiated
            && self.expires_at.map(|at| now >= at).unwrap_or(false)
    }

    /// Attach the counterpart leg and mark this leg complete.
    pub fn complete_with(&mut self, counterpart: &Erc721BridgeRequest) {
        self.status = NftBridgeStatus::Completed;
        self.counterpart_request = Some(counterpart.id.clone());
        self.counterpart_tx = Some(counterpart.tx_hash.clone());
        if self.direction == Direction::Outbound {
            self.completed_at = Some(counterpart.created_at);
        }
    }

    /// Reconciliation hook: give up on a leg that never completed.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> bool {
        if self.status != NftBridgeStatus::Initiated {
            return false;
        }
        self.status = NftBridgeStatus::Failed;
        self.failure_reason = Some(reason.into());
        true
    }

    /// Reconciliation hook: extend the deadline after a retry.
    pub fn record_retry(&mut self, new_expires_at: Timestamp) {
        self.retry_count = self.retry_count.saturating_add(1);
        self.expires_at = Some(new_expires_at);
    }
}

impl Entity for Erc721BridgeRequest {
    const KIND: EntityKind = EntityKind::Erc721BridgeRequest;

    fn id(&self) -> String {
        self.id.clone()
    }
}

/// Legacy single-record view of an NFT bridge leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc721BridgeTransaction {
    pub id: String,
    pub token: Address,
    pub token_id: Amount,
    pub user: Address,
    pub source_chain_id: ChainId,
    pub target_chain_id: ChainId,
    pub bridge_type: BridgeType,
    pub direction: Direction,
    pub status: NftBridgeStatus,
    pub tx_hash: TxHash,
    pub timestamp: Timestamp,
}

impl Erc721BridgeTransaction {
    /// `{token}-{tokenId}-{user}-{targetChainId}`
    pub fn outbound_key(token: &Address, token_id: Amount, user: &Address, target: ChainId) -> String {
        format!("{}-{}-{}-{}", token, token_id, user, target)
    }
}

impl Entity for Erc721BridgeTransaction {
    const KIND: EntityKind = EntityKind::Erc721BridgeTransaction;

    fn id(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelatedLeg {
    pub request_id: String,
    pub at: Timestamp,
}

/// Write-time pairing index keyed by `cross_chain_tx_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeCorrelation {
    pub id: String,
    #[serde(default)]
    pub outbound: Option<CorrelatedLeg>,
    #[serde(default)]
    pub inbound: Option<CorrelatedLeg>,
    pub status: NftBridgeStatus,
}

impl BridgeCorrelation {
    pub fn with_outbound(id: String, leg: CorrelatedLeg) -> Self {
        Self {
            id,
            outbound: Some(leg),
            inbound: None,
            status: NftBridgeStatus::Initiated,
        }
    }

    pub fn with_inbound(id: String, leg: CorrelatedLeg) -> Self {
        Self {
            id,
            outbound: None,
            inbound: Some(leg),
            status: NftBridgeStatus::Initiated,
        }
    }

    pub fn is_paired(&self) -> bool {
        self.outbound.is_some() && self.inbound.is_some()
    }
}

impl Entity for BridgeCorrelation {
    const KIND: EntityKind = EntityKind::BridgeCorrelation;

    fn id(&self) -> String {
        self.id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(direction: Direction, created_at: i64) -> Erc721BridgeRequest {
        Erc721BridgeRequest {
            id: format!("0x{:x}-0", created_at),
            direction,
            bridge_type: BridgeType::LockMint,
            status: NftBridgeStatus::Initiated,
            token: Address::new("0xaa"),
            token_id: Amount::from_u64(7),
            user: Address::new("0xbb"),
            source_chain_id: ChainId(1),
            dest_chain_id: ChainId(137),
            cross_chain_tx_hash: String::new(),
            tx_hash: TxHash::new(format!("0x{:x}", created_at)),
            block_number: 1,
            created_at: Timestamp::new(created_at),
            expires_at: Some(Timestamp::new(created_at + 100)),
            retry_count: 0,
            completed_at: None,
            counterpart_request: None,
            counterpart_tx: None,
            failure_reason: None,
        }
    }

    #[test]
    fn test_cross_chain_tx_hash_layout() {
        let key = cross_chain_tx_hash(
            &Address::new("0xAA"),
            Amount::from_u64(1),
            &Address::new("0xbb"),
            ChainId(1),
            ChainId(137),
        );
        let expected = format!(
            "0xaa{}bb{:016x}{:016x}",
            format!("{:064x}", 1),
            1u64,
            137u64
        );
        assert_eq!(key, expected);
    }

    #[test]
    fn test_cross_chain_tx_hash_distinguishes_direction() {
        let token = Address::new("0xaa");
        let user = Address::new("0xbb");
        let there = cross_chain_tx_hash(&token, Amount::from_u64(1), &user, ChainId(1), ChainId(2));
        let back = cross_chain_tx_hash(&token, Amount::from_u64(1), &user, ChainId(2), ChainId(1));
        assert_ne!(there, back);
    }

    #[test]
    fn test_expiry_only_for_initiated() {
        let mut req = request(Direction::Outbound, 1000);
        assert!(!req.is_expired(Timestamp::new(1050)));
        assert!(req.is_expired(Timestamp::new(1100)));

        let inbound = request(Direction::Inbound, 1200);
        req.complete_with(&inbound);
        assert!(!req.is_expired(Timestamp::new(5000)));
        assert_eq!(req.completed_at, Some(Timestamp::new(1200)));
        assert_eq!(req.counterpart_request.as_deref(), Some(inbound.id.as_str()));
    }

    #[test]
    fn test_reconciliation_hooks() {
        let mut req = request(Direction::Outbound, 1000);
        req.record_retry(Timestamp::new(3000));
        assert_eq!(req.retry_count, 1);
        assert_eq!(req.expires_at, Some(Timestamp::new(3000)));

        assert!(req.mark_failed("no inbound leg"));
        assert_eq!(req.status, NftBridgeStatus::Failed);
        assert!(!req.mark_failed("again"));
    }
}
