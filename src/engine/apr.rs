//! Allocation-weighted lending APR.

use super::{key_of, ProjectionError, Projector};
use crate::domain::{Amount, Curator, CuratorLendApr, EventMeta, Pool, Provenance};
use crate::store::Changeset;
use tracing::{debug, warn};

/// Running weighted average of pool lending rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeightedApr {
    total_weighted: Amount,
    total_allocated: Amount,
}

impl WeightedApr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one pool. Zero allocations contribute nothing.
    pub fn add(&mut self, allocation: Amount, lending_rate: Amount) {
        if allocation.is_zero() {
            return;
        }
        self.total_allocated = self.total_allocated.saturating_add(allocation);
        self.total_weighted = self
            .total_weighted
            .saturating_add(allocation.saturating_mul(lending_rate));
    }

    /// `total_weighted / total_allocated`, truncated; zero when nothing is allocated.
    pub fn apr(&self) -> Amount {
        self.total_weighted.div_or_zero(self.total_allocated)
    }

    pub fn total_allocated(&self) -> Amount {
        self.total_allocated
    }
}

impl Projector {
    /// Recompute `currentLendAPR` and append a snapshot.
    ///
    /// Allocations come from the chain; a pool without a Pool record or whose
    /// read fails is left out of the average.
    pub(crate) async fn recompute_apr(
        &self,
        meta: &EventMeta,
        curator: &mut Curator,
        changes: &mut Changeset<'_>,
    ) -> Result<Amount, ProjectionError> {
        let mut weighted = WeightedApr::new();

        for pool_id in &curator.pools {
            let Some(pool) = changes.load::<Pool>(pool_id.as_str()).await? else {
                continue;
            };
            match self.chain.pool_allocations(&curator.id, pool_id).await {
                Ok(allocation) => weighted.add(allocation, pool.lending_rate),
                Err(e) => {
                    warn!(event_key = %key_of(meta), curator = %curator.id, pool = %pool_id, error = %e, "poolAllocations read failed, excluding pool");
                }
            }
        }

        let apr = weighted.apr();
        curator.current_lend_apr = apr;

        let mut id = CuratorLendApr::key(&curator.id, meta.block_timestamp);
        if changes.exists::<CuratorLendApr>(&id).await? {
            id = CuratorLendApr::disambiguated_key(
                &curator.id,
                meta.block_timestamp,
                meta.block_number,
                meta.log_index,
            );
        }
        let snapshot = CuratorLendApr {
            id,
            curator: curator.id.clone(),
            apr,
            total_allocated: weighted.total_allocated(),
            provenance: Provenance::from(meta),
        };
        changes.save(&snapshot)?;

        debug!(curator = %curator.id, apr = %apr, total_allocated = %snapshot.total_allocated, "Lend APR recomputed");
        Ok(apr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_average_truncates() {
        let mut w = WeightedApr::new();
        w.add(Amount::from_u64(300), Amount::from_u64(500));
        w.add(Amount::from_u64(700), Amount::from_u64(1000));
        // (150000 + 700000) / 1000
        assert_eq!(w.apr(), Amount::from_u64(850));
        assert_eq!(w.total_allocated(), Amount::from_u64(1000));

        let mut w = WeightedApr::new();
        w.add(Amount::from_u64(3), Amount::from_u64(1));
        w.add(Amount::from_u64(1), Amount::from_u64(2));
        // 5 / 4
        assert_eq!(w.apr(), Amount::from_u64(1));
    }

    #[test]
    fn test_zero_allocation_is_ignored() {
        let mut w = WeightedApr::new();
        w.add(Amount::ZERO, Amount::from_u64(9999));
        assert_eq!(w.apr(), Amount::ZERO);
        assert_eq!(w.total_allocated(), Amount::ZERO);

        w.add(Amount::from_u64(10), Amount::from_u64(400));
        assert_eq!(w.apr(), Amount::from_u64(400));
    }
}
