//! Fungible bridge correlation by message id.

use super::{applied, key_of, skipped, Handled, Projector, SkipReason};
use crate::domain::{
    BridgeStatus, BridgeTransaction, EventMeta, TokensBridgedParams, TokensReceivedParams,
};
use crate::store::Changeset;
use tracing::{debug, info};

impl Projector {
    /// Outbound leg. Creates or refreshes the record; a completed record keeps its status.
    pub(crate) async fn on_tokens_bridged(
        &self,
        meta: &EventMeta,
        params: &TokensBridgedParams,
        changes: &mut Changeset<'_>,
    ) -> Handled {
        let existing = changes.load::<BridgeTransaction>(&params.message_id).await?;
        let status = match &existing {
            Some(tx) if tx.status.is_terminal() => {
                debug!(event_key = %key_of(meta), message_id = %params.message_id, "Outbound leg arrived after completion");
                tx.status
            }
            _ => BridgeStatus::Pending,
        };

        let record = BridgeTransaction {
            message_id: params.message_id.clone(),
            status,
            token: params.token.clone(),
            amount: params.amount,
            sender: Some(params.sender.clone()),
            receiver: params.receiver.clone(),
            source_chain_selector: self.settings.chain_selector,
            dest_chain_selector: Some(params.dest_chain_selector),
            fees: Some(params.fees),
            created_at: Some(meta.block_timestamp),
            source_block: Some(meta.block_number),
            source_tx: Some(meta.tx_hash.clone()),
            received_at: existing.as_ref().and_then(|tx| tx.received_at),
            dest_block: existing.as_ref().and_then(|tx| tx.dest_block),
            dest_tx: existing.and_then(|tx| tx.dest_tx),
        };
        changes.save(&record)?;

        applied(changes)
    }

    /// Inbound leg. Completes the record, or synthesizes a completed one.
    pub(crate) async fn on_tokens_received(
        &self,
        meta: &EventMeta,
        params: &TokensReceivedParams,
        changes: &mut Changeset<'_>,
    ) -> Handled {
        match changes.load::<BridgeTransaction>(&params.message_id).await? {
            Some(mut record) => {
                if !record.complete(meta.block_timestamp, meta.block_number, meta.tx_hash.clone()) {
                    debug!(event_key = %key_of(meta), message_id = %params.message_id, "Bridge message already completed");
                    return skipped(SkipReason::AlreadyCompleted);
                }
                changes.save(&record)?;
            }
            None => {
                info!(event_key = %key_of(meta), message_id = %params.message_id, "Inbound message with no outbound record, synthesizing");
                let record = BridgeTransaction {
                    message_id: params.message_id.clone(),
                    status: BridgeStatus::Completed,
                    token: params.token.clone(),
                    amount: params.amount,
                    sender: None,
                    receiver: params.receiver.clone(),
                    source_chain_selector: params.source_chain_selector,
                    dest_chain_selector: Some(self.settings.chain_selector),
                    fees: None,
                    created_at: None,
                    source_block: None,
                    source_tx: None,
                    received_at: Some(meta.block_timestamp),
                    dest_block: Some(meta.block_number),
                    dest_tx: Some(meta.tx_hash.clone()),
                };
                changes.save(&record)?;
            }
        }

        applied(changes)
    }
}
