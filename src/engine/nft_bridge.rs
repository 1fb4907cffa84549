//! NFT bridge legs, paired at write time through [`BridgeCorrelation`].

use super::{applied, key_of, Handled, Projector};
use crate::domain::{
    cross_chain_tx_hash, BridgeCorrelation, BridgeType, ChainId, CorrelatedLeg, Direction,
    Erc721BridgeRequest, Erc721BridgeTransaction, EventMeta, NftBridgeStatus, NftInboundParams,
    NftOutboundParams, Timestamp,
};
use crate::store::{Changeset, StoreError};
use tracing::{debug, info, warn};

/// Source-chain event that starts an NFT bridge leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NftOutboundKind {
    Locked,
    Burned,
}

/// Destination-chain event that finishes an NFT bridge leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NftInboundKind {
    Minted,
    Unlocked,
}

impl Projector {
    /// A burn bound for the home chain unlocks the original there.
    pub fn outbound_bridge_type(&self, kind: NftOutboundKind, dest: ChainId) -> BridgeType {
        match kind {
            NftOutboundKind::Locked => BridgeType::LockMint,
            NftOutboundKind::Burned if self.settings.nft_home_chain == Some(dest) => {
                BridgeType::BurnUnlock
            }
            NftOutboundKind::Burned => BridgeType::BurnMint,
        }
    }

    /// A mint is a lock-mint unless it came from a chain other than the home chain.
    pub fn inbound_bridge_type(&self, kind: NftInboundKind, source: ChainId) -> BridgeType {
        let home = self.settings.nft_home_chain;
        match kind {
            NftInboundKind::Minted if home.is_none() || home == Some(source) => BridgeType::LockMint,
            NftInboundKind::Minted => BridgeType::BurnMint,
            NftInboundKind::Unlocked => BridgeType::BurnUnlock,
        }
    }

    fn within_window(&self, a: Timestamp, b: Timestamp) -> bool {
        a.abs_diff(b) < self.settings.nft_correlation_window_secs
    }

    /// TokenLocked / TokenBurned on the source chain.
    pub(crate) async fn on_nft_outbound(
        &self,
        meta: &EventMeta,
        kind: NftOutboundKind,
        params: &NftOutboundParams,
        changes: &mut Changeset<'_>,
    ) -> Handled {
        let source = meta.chain_id;
        let dest = params.target_chain_id;
        let bridge_type = self.outbound_bridge_type(kind, dest);
        let key = cross_chain_tx_hash(&params.token, params.token_id, &params.user, source, dest);

        let mut request = Erc721BridgeRequest {
            id: meta.log_id(),
            direction: Direction::Outbound,
            bridge_type,
            status: NftBridgeStatus::Initiated,
            token: params.token.clone(),
            token_id: params.token_id,
            user: params.user.clone(),
            source_chain_id: source,
            dest_chain_id: dest,
            cross_chain_tx_hash: key.clone(),
            tx_hash: meta.tx_hash.clone(),
            block_number: meta.block_number,
            created_at: meta.block_timestamp,
            expires_at: Some(meta.block_timestamp.plus_secs(self.settings.nft_expiration_window_secs)),
            retry_count: 0,
            completed_at: None,
            counterpart_request: None,
            counterpart_tx: None,
            failure_reason: None,
        };
        let leg = CorrelatedLeg {
            request_id: request.id.clone(),
            at: meta.block_timestamp,
        };

        let waiting = changes
            .load::<BridgeCorrelation>(&key)
            .await?
            .filter(|c| c.outbound.is_none())
            .and_then(|c| c.inbound.clone().map(|inbound| (c, inbound)))
            .filter(|(_, inbound)| self.within_window(inbound.at, meta.block_timestamp));

        let correlation = match waiting {
            Some((mut correlation, inbound_leg)) => {
                match changes.load::<Erc721BridgeRequest>(&inbound_leg.request_id).await? {
                    Some(mut inbound) => {
                        request.complete_with(&inbound);
                        inbound.complete_with(&request);
                        changes.save(&inbound)?;
                    }
                    None => {
                        warn!(event_key = %key_of(meta), request = %inbound_leg.request_id, "Correlated inbound request missing");
                    }
                }
                info!(correlation = %key, outbound = %request.id, inbound = %inbound_leg.request_id, "NFT bridge legs paired");
                correlation.outbound = Some(leg);
                correlation.status = NftBridgeStatus::Completed;
                correlation
            }
            None => {
                debug!(correlation = %key, outbound = %request.id, "Outbound NFT leg waiting for counterpart");
                BridgeCorrelation::with_outbound(key, leg)
            }
        };
        changes.save(&correlation)?;
        changes.save(&request)?;

        let legacy = Erc721BridgeTransaction {
            id: Erc721BridgeTransaction::outbound_key(&params.token, params.token_id, &params.user, dest),
            token: params.token.clone(),
            token_id: params.token_id,
            user: params.user.clone(),
            source_chain_id: source,
            target_chain_id: dest,
            bridge_type,
            direction: Direction::Outbound,
            status: request.status,
            tx_hash: meta.tx_hash.clone(),
            timestamp: meta.block_timestamp,
        };
        changes.save(&legacy)?;

        applied(changes)
    }

    /// TokenMinted / TokenUnlocked on the destination chain.
    pub(crate) async fn on_nft_inbound(
        &self,
        meta: &EventMeta,
        kind: NftInboundKind,
        params: &NftInboundParams,
        changes: &mut Changeset<'_>,
    ) -> Handled {
        let source = params.source_chain_id;
        let dest = meta.chain_id;
        let bridge_type = self.inbound_bridge_type(kind, source);
        let key = cross_chain_tx_hash(&params.token, params.token_id, &params.user, source, dest);

        let mut request = Erc721BridgeRequest {
            id: meta.log_id(),
            direction: Direction::Inbound,
            bridge_type,
            status: NftBridgeStatus::Completed,
            token: params.token.clone(),
            token_id: params.token_id,
            user: params.user.clone(),
            source_chain_id: source,
            dest_chain_id: dest,
            cross_chain_tx_hash: key.clone(),
            tx_hash: meta.tx_hash.clone(),
            block_number: meta.block_number,
            created_at: meta.block_timestamp,
            expires_at: None,
            retry_count: 0,
            completed_at: Some(meta.block_timestamp),
            counterpart_request: None,
            counterpart_tx: None,
            failure_reason: None,
        };
        let leg = CorrelatedLeg {
            request_id: request.id.clone(),
            at: meta.block_timestamp,
        };

        let waiting = changes
            .load::<BridgeCorrelation>(&key)
            .await?
            .filter(|c| c.inbound.is_none())
            .and_then(|c| c.outbound.clone().map(|outbound| (c, outbound)))
            .filter(|(_, outbound)| self.within_window(outbound.at, meta.block_timestamp));

        let correlation = match waiting {
            Some((mut correlation, outbound_leg)) => {
                match changes.load::<Erc721BridgeRequest>(&outbound_leg.request_id).await? {
                    Some(mut outbound) => {
                        outbound.complete_with(&request);
                        request.complete_with(&outbound);
                        complete_legacy_outbound(&outbound, changes).await?;
                        changes.save(&outbound)?;
                    }
                    None => {
                        warn!(event_key = %key_of(meta), request = %outbound_leg.request_id, "Correlated outbound request missing");
                    }
                }
                info!(correlation = %key, outbound = %outbound_leg.request_id, inbound = %request.id, "NFT bridge legs paired");
                correlation.inbound = Some(leg);
                correlation.status = NftBridgeStatus::Completed;
                correlation
            }
            None => {
                debug!(correlation = %key, inbound = %request.id, "Inbound NFT leg waiting for counterpart");
                BridgeCorrelation::with_inbound(key, leg)
            }
        };
        changes.save(&correlation)?;
        changes.save(&request)?;

        let legacy = Erc721BridgeTransaction {
            id: meta.tx_hash.as_str().to_string(),
            token: params.token.clone(),
            token_id: params.token_id,
            user: params.user.clone(),
            source_chain_id: source,
            target_chain_id: dest,
            bridge_type,
            direction: Direction::Inbound,
            status: NftBridgeStatus::Completed,
            tx_hash: meta.tx_hash.clone(),
            timestamp: meta.block_timestamp,
        };
        changes.save(&legacy)?;

        applied(changes)
    }
}

/// Mirror a completed outbound request onto its legacy record, if present.
async fn complete_legacy_outbound(
    outbound: &Erc721BridgeRequest,
    changes: &mut Changeset<'_>,
) -> Result<(), StoreError> {
    let id = Erc721BridgeTransaction::outbound_key(
        &outbound.token,
        outbound.token_id,
        &outbound.user,
        outbound.dest_chain_id,
    );
    if let Some(mut legacy) = changes.load::<Erc721BridgeTransaction>(&id).await? {
        legacy.status = NftBridgeStatus::Completed;
        changes.save(&legacy)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainReader;
    use crate::engine::ProjectionSettings;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn projector(home: Option<u64>) -> Projector {
        Projector::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MockChainReader::new()),
            ProjectionSettings {
                nft_home_chain: home.map(ChainId),
                ..ProjectionSettings::default()
            },
        )
    }

    #[test]
    fn test_bridge_type_rules() {
        let p = projector(Some(1));
        let (home, side) = (ChainId(1), ChainId(137));

        assert_eq!(
            p.outbound_bridge_type(NftOutboundKind::Locked, side),
            BridgeType::LockMint
        );
        assert_eq!(
            p.outbound_bridge_type(NftOutboundKind::Burned, home),
            BridgeType::BurnUnlock
        );
        assert_eq!(
            p.outbound_bridge_type(NftOutboundKind::Burned, ChainId(10)),
            BridgeType::BurnMint
        );
        assert_eq!(
            p.inbound_bridge_type(NftInboundKind::Minted, home),
            BridgeType::LockMint
        );
        assert_eq!(
            p.inbound_bridge_type(NftInboundKind::Minted, ChainId(10)),
            BridgeType::BurnMint
        );
        assert_eq!(
            p.inbound_bridge_type(NftInboundKind::Unlocked, side),
            BridgeType::BurnUnlock
        );
    }

    #[test]
    fn test_minted_without_home_chain_is_lock_mint() {
        let p = projector(None);
        assert_eq!(
            p.inbound_bridge_type(NftInboundKind::Minted, ChainId(10)),
            BridgeType::LockMint
        );
        assert_eq!(
            p.outbound_bridge_type(NftOutboundKind::Burned, ChainId(1)),
            BridgeType::BurnMint
        );
    }
}
