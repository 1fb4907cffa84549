//! Mock chain reader for testing without an RPC endpoint.

use super::{ChainReadError, ChainReader};
use crate::domain::{Address, Amount, PoolId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct MockState {
    total_assets: HashMap<Address, Amount>,
    total_supply: HashMap<Address, Amount>,
    allocations: HashMap<(Address, PoolId), Amount>,
    failing_vaults: HashSet<Address>,
    failing_pools: HashSet<(Address, PoolId)>,
    calls: usize,
}

/// Mock chain reader that returns predefined contract state.
///
/// Unknown keys read as zero. Values can be changed after construction so a
/// test can move chain state between events.
#[derive(Debug, Default)]
pub struct MockChainReader {
    state: Mutex<MockState>,
}

impl MockChainReader {
    /// Create a new mock reader where every read returns zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `totalAssets()` for a vault.
    pub fn with_total_assets(self, vault: &Address, value: Amount) -> Self {
        self.set_total_assets(vault, value);
        self
    }

    /// Set `totalSupply()` for a vault.
    pub fn with_total_supply(self, vault: &Address, value: Amount) -> Self {
        self.set_total_supply(vault, value);
        self
    }

    /// Set `poolAllocations(poolId)` for a curator.
    pub fn with_allocation(self, curator: &Address, pool: &PoolId, value: Amount) -> Self {
        self.set_allocation(curator, pool, value);
        self
    }

    /// Make every totals read for a vault fail.
    pub fn with_failing_vault(self, vault: &Address) -> Self {
        self.lock().failing_vaults.insert(vault.clone());
        self
    }

    /// Make the allocation read for one curator/pool pair fail.
    pub fn with_failing_allocation(self, curator: &Address, pool: &PoolId) -> Self {
        self.lock()
            .failing_pools
            .insert((curator.clone(), pool.clone()));
        self
    }

    pub fn set_total_assets(&self, vault: &Address, value: Amount) {
        self.lock().total_assets.insert(vault.clone(), value);
    }

    pub fn set_total_supply(&self, vault: &Address, value: Amount) {
        self.lock().total_supply.insert(vault.clone(), value);
    }

    pub fn set_allocation(&self, curator: &Address, pool: &PoolId, value: Amount) {
        self.lock()
            .allocations
            .insert((curator.clone(), pool.clone()), value);
    }

    /// Number of reads served so far.
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_total(
        &self,
        vault: &Address,
        pick: impl Fn(&MockState) -> &HashMap<Address, Amount>,
    ) -> Result<Amount, ChainReadError> {
        let mut state = self.lock();
        state.calls += 1;
        if state.failing_vaults.contains(vault) {
            return Err(ChainReadError::Unavailable(format!("mock: vault {}", vault)));
        }
        Ok(pick(&state).get(vault).copied().unwrap_or(Amount::ZERO))
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn total_assets(&self, vault: &Address) -> Result<Amount, ChainReadError> {
        self.read_total(vault, |s| &s.total_assets)
    }

    async fn total_supply(&self, vault: &Address) -> Result<Amount, ChainReadError> {
        self.read_total(vault, |s| &s.total_supply)
    }

    async fn pool_allocations(
        &self,
        curator: &Address,
        pool_id: &PoolId,
    ) -> Result<Amount, ChainReadError> {
        let mut state = self.lock();
        state.calls += 1;
        let key = (curator.clone(), pool_id.clone());
        if state.failing_pools.contains(&key) {
            return Err(ChainReadError::Unavailable(format!(
                "mock: allocation {}/{}",
                curator, pool_id
            )));
        }
        Ok(state.allocations.get(&key).copied().unwrap_or(Amount::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_reader_defaults_to_zero() {
        let reader = MockChainReader::new();
        let vault = Address::new("0xv");
        assert_eq!(reader.total_assets(&vault).await.unwrap(), Amount::ZERO);
        assert_eq!(reader.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_reader_values_and_failures() {
        let vault = Address::new("0xv");
        let pool = PoolId::new("0x01");
        let reader = MockChainReader::new()
            .with_total_assets(&vault, Amount::from_u64(1000))
            .with_allocation(&vault, &pool, Amount::from_u64(300))
            .with_failing_allocation(&vault, &PoolId::new("0x02"));

        assert_eq!(
            reader.total_assets(&vault).await.unwrap(),
            Amount::from_u64(1000)
        );
        assert_eq!(
            reader.pool_allocations(&vault, &pool).await.unwrap(),
            Amount::from_u64(300)
        );
        assert!(reader
            .pool_allocations(&vault, &PoolId::new("0x02"))
            .await
            .is_err());

        reader.set_total_assets(&vault, Amount::from_u64(5));
        assert_eq!(reader.total_assets(&vault).await.unwrap(), Amount::from_u64(5));
    }

    #[tokio::test]
    async fn test_failing_vault() {
        let vault = Address::new("0xv");
        let reader = MockChainReader::new().with_failing_vault(&vault);
        assert!(matches!(
            reader.total_supply(&vault).await,
            Err(ChainReadError::Unavailable(_))
        ));
    }
}
