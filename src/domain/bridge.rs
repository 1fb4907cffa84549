//! Fungible bridge transaction keyed by the protocol message id.

use crate::domain::{Address, Amount, Entity, EntityKind, Timestamp, TxHash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a fungible bridge message. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeStatus {
    Pending,
    Completed,
}

impl BridgeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BridgeStatus::Completed)
    }
}

impl fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeStatus::Pending => write!(f, "PENDING"),
            BridgeStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// One cross-chain token transfer. Outbound fields and inbound fields are
/// disjoint so either leg can be written first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeTransaction {
    pub message_id: String,
    pub status: BridgeStatus,
    pub token: Address,
    pub amount: Amount,
    #[serde(default)]
    pub sender: Option<Address>,
    pub receiver: Address,
    pub source_chain_selector: u64,
    #[serde(default)]
    pub dest_chain_selector: Option<u64>,
    #[serde(default)]
    pub fees: Option<Amount>,

    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub source_block: Option<u64>,
    #[serde(default)]
    pub source_tx: Option<TxHash>,

    #[serde(default)]
    pub received_at: Option<Timestamp>,
    #[serde(default)]
    pub dest_block: Option<u64>,
    #[serde(default)]
    pub dest_tx: Option<TxHash>,
}

impl BridgeTransaction {
    /// Transition to `Completed`. Returns false if already terminal.
    pub fn complete(&mut self, received_at: Timestamp, dest_block: u64, dest_tx: TxHash) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = BridgeStatus::Completed;
        self.received_at = Some(received_at);
        self.dest_block = Some(dest_block);
        self.dest_tx = Some(dest_tx);
        true
    }
}

impl Entity for BridgeTransaction {
    const KIND: EntityKind = EntityKind::BridgeTransaction;

    fn id(&self) -> String {
        self.message_id.clone()
    }
}
