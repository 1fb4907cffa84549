mod common;

use async_trait::async_trait;
use common::*;
use std::sync::Arc;
use std::time::Duration;
use vaultgraph::domain::{
    cross_chain_tx_hash, BridgeCorrelation, BridgeStatus, BridgeTransaction, ChainId, EntityKind,
    EventMeta, EventPayload, NftInboundParams, NftOutboundParams, TokensBridgedParams,
    TokensReceivedParams,
};
use vaultgraph::engine::ProjectionSettings;
use vaultgraph::store::{EntityWrite, StoreError};
use vaultgraph::{ApplyLock, EntityStore, MemoryStore, MockChainReader, Projector, StreamCursor};

const ARB_CHAIN: u64 = 42161;
const BRIDGE: &str = "0xb41d9e0000000000000000000000000000000001";
const MESSAGE: &str = "0x5e55a9e000000000000000000000000000000000000000000000000000000002";

/// Memory store whose commits for one chain land late, widening the window
/// between a handler's reads and its writes.
#[derive(Debug)]
struct SlowCommitStore {
    inner: MemoryStore,
    slow_chain: ChainId,
    delay: Duration,
}

#[async_trait]
impl EntityStore for SlowCommitStore {
    async fn load_raw(&self, kind: EntityKind, id: &str) -> Result<Option<String>, StoreError> {
        self.inner.load_raw(kind, id).await
    }

    async fn is_applied(&self, event_key: &str) -> Result<bool, StoreError> {
        self.inner.is_applied(event_key).await
    }

    async fn commit(&self, meta: &EventMeta, writes: &[EntityWrite]) -> Result<bool, StoreError> {
        if meta.chain_id == self.slow_chain {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.commit(meta, writes).await
    }

    async fn load_cursor(&self, stream_id: &str) -> Result<Option<StreamCursor>, StoreError> {
        self.inner.load_cursor(stream_id).await
    }

    async fn store_cursor(&self, cursor: &StreamCursor) -> Result<(), StoreError> {
        self.inner.store_cursor(cursor).await
    }

    async fn list_cursors(&self) -> Result<Vec<StreamCursor>, StoreError> {
        self.inner.list_cursors().await
    }
}

/// Projectors for two chains writing to one store, as `main` wires them.
fn two_streams(settings: ProjectionSettings) -> (Arc<SlowCommitStore>, Projector, Projector) {
    let store = Arc::new(SlowCommitStore {
        inner: MemoryStore::new(),
        slow_chain: ChainId(CHAIN),
        delay: Duration::from_millis(50),
    });
    let lock = ApplyLock::default();
    let source = Projector::new(
        store.clone(),
        Arc::new(MockChainReader::new()),
        settings.clone(),
    )
    .with_apply_lock(lock.clone());
    let destination = Projector::new(store.clone(), Arc::new(MockChainReader::new()), settings)
        .with_apply_lock(lock);
    (store, source, destination)
}

#[tokio::test]
async fn test_concurrent_bridge_legs_end_completed() {
    let (store, source, destination) = two_streams(ProjectionSettings::default());

    let bridged = event(
        BRIDGE,
        100,
        0,
        EventPayload::TokensBridged(TokensBridgedParams {
            message_id: MESSAGE.to_string(),
            token: addr(USDC),
            amount: amt(500),
            sender: addr(ALICE),
            receiver: addr(BOB),
            dest_chain_selector: 4_949_039_107_694_359_620,
            fees: amt(1),
        }),
    );
    let received = event_on(
        ARB_CHAIN,
        BRIDGE,
        900,
        1210,
        0,
        EventPayload::TokensReceived(TokensReceivedParams {
            message_id: MESSAGE.to_string(),
            token: addr(USDC),
            amount: amt(500),
            receiver: addr(BOB),
            source_chain_selector: 15_971_525_489_660_198_786,
        }),
    );

    let (a, b) = tokio::join!(source.apply(&bridged), destination.apply(&received));
    a.unwrap();
    b.unwrap();

    let store: &dyn EntityStore = store.as_ref();
    let record = store
        .load::<BridgeTransaction>(MESSAGE)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, BridgeStatus::Completed);
    assert!(record.received_at.is_some());
    assert_eq!(record.source_block, Some(100));
}

#[tokio::test]
async fn test_concurrent_nft_legs_pair() {
    let (store, source, destination) = two_streams(ProjectionSettings {
        nft_home_chain: Some(ChainId(CHAIN)),
        ..ProjectionSettings::default()
    });
    let nft = "0x00000000000000000000000000000000000721aa";

    let locked = event_on(
        CHAIN,
        BRIDGE,
        100,
        1200,
        0,
        EventPayload::TokenLocked(NftOutboundParams {
            token: addr(nft),
            token_id: amt(11),
            user: addr(ALICE),
            target_chain_id: ChainId(ARB_CHAIN),
        }),
    );
    let minted = event_on(
        ARB_CHAIN,
        BRIDGE,
        900,
        1230,
        1,
        EventPayload::TokenMinted(NftInboundParams {
            token: addr(nft),
            token_id: amt(11),
            user: addr(ALICE),
            source_chain_id: ChainId(CHAIN),
        }),
    );

    let (a, b) = tokio::join!(source.apply(&locked), destination.apply(&minted));
    a.unwrap();
    b.unwrap();

    let key = cross_chain_tx_hash(
        &addr(nft),
        amt(11),
        &addr(ALICE),
        ChainId(CHAIN),
        ChainId(ARB_CHAIN),
    );
    let store: &dyn EntityStore = store.as_ref();
    let correlation = store
        .load::<BridgeCorrelation>(&key)
        .await
        .unwrap()
        .unwrap();
    assert!(correlation.is_paired());
}
