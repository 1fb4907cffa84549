//! Pool registry and curator allocation transitions.

use super::{applied, key_of, load_or_create_account, skipped, Handled, Projector, SkipReason};
use crate::domain::{
    AllocationBatchSetupParams, AllocationSetupParams, Amount, Curator, EventMeta, Pool,
    PoolAllocation, PoolCreatedParams, PoolId, PoolRateUpdatedParams,
};
use crate::store::{Changeset, StoreError};
use tracing::{info, warn};

async fn upsert_allocation(
    meta: &EventMeta,
    curator: &Curator,
    pool: &PoolId,
    allocation: Amount,
    changes: &mut Changeset<'_>,
) -> Result<(), StoreError> {
    let key = PoolAllocation::key(&curator.id, pool);
    let existing = changes.load::<PoolAllocation>(&key).await?;
    let updated = PoolAllocation::upsert(existing, curator, pool, allocation, meta.block_timestamp);
    changes.save(&updated)
}

impl Projector {
    pub(crate) async fn on_allocation_setup(
        &self,
        meta: &EventMeta,
        params: &AllocationSetupParams,
        changes: &mut Changeset<'_>,
    ) -> Handled {
        let Some(mut curator) = changes.load::<Curator>(meta.contract.as_str()).await? else {
            warn!(event_key = %key_of(meta), curator = %meta.contract, "Curator not found, skipping allocation");
            return skipped(SkipReason::MissingCurator);
        };

        if changes.exists::<Pool>(params.pool_id.as_str()).await? {
            curator.add_pool(&params.pool_id);
        } else {
            warn!(event_key = %key_of(meta), pool = %params.pool_id, "Pool not found, allocation recorded without linking");
        }

        upsert_allocation(meta, &curator, &params.pool_id, params.allocation, changes).await?;

        self.recompute_apr(meta, &mut curator, changes).await?;
        curator.updated_at = meta.block_timestamp;
        changes.save(&curator)?;

        applied(changes)
    }

    /// Replaces the curator's pool set and raw allocations wholesale.
    ///
    /// Pools that were linked before but are absent from the batch are zeroed.
    pub(crate) async fn on_allocation_batch_setup(
        &self,
        meta: &EventMeta,
        params: &AllocationBatchSetupParams,
        changes: &mut Changeset<'_>,
    ) -> Handled {
        let Some(mut curator) = changes.load::<Curator>(meta.contract.as_str()).await? else {
            warn!(event_key = %key_of(meta), curator = %meta.contract, "Curator not found, skipping batch allocation");
            return skipped(SkipReason::MissingCurator);
        };

        if params.pool_ids.len() != params.allocations.len() {
            warn!(
                event_key = %key_of(meta),
                pools = params.pool_ids.len(),
                allocations = params.allocations.len(),
                "Batch allocation arrays differ in length, skipping"
            );
            return skipped(SkipReason::MalformedEvent);
        }

        let previous = std::mem::take(&mut curator.pools);
        for pool_id in &params.pool_ids {
            if changes.exists::<Pool>(pool_id.as_str()).await? {
                curator.add_pool(pool_id);
            }
        }
        curator.allocations = params.allocations.clone();

        for (pool_id, allocation) in params.pool_ids.iter().zip(&params.allocations) {
            upsert_allocation(meta, &curator, pool_id, *allocation, changes).await?;
        }

        for dropped in previous.iter().filter(|p| !params.pool_ids.contains(p)) {
            info!(curator = %curator.id, pool = %dropped, "Pool dropped from batch, zeroing allocation");
            upsert_allocation(meta, &curator, dropped, Amount::ZERO, changes).await?;
        }

        self.recompute_apr(meta, &mut curator, changes).await?;
        curator.updated_at = meta.block_timestamp;
        changes.save(&curator)?;

        applied(changes)
    }

    pub(crate) async fn on_pool_created(
        &self,
        meta: &EventMeta,
        params: &PoolCreatedParams,
        changes: &mut Changeset<'_>,
    ) -> Handled {
        if changes.exists::<Pool>(params.pool_id.as_str()).await? {
            info!(event_key = %key_of(meta), pool = %params.pool_id, "Pool already exists");
            return skipped(SkipReason::AlreadyExists);
        }

        let pool = Pool {
            id: params.pool_id.clone(),
            loan_token: params.loan_token.clone(),
            collateral_token: params.collateral_token.clone(),
            creator: params.creator.clone(),
            lending_rate: Amount::ZERO,
            borrow_rate: Amount::ZERO,
            utilization: Amount::ZERO,
            created_at: meta.block_timestamp,
            updated_at: meta.block_timestamp,
        };
        changes.save(&pool)?;

        let mut creator = load_or_create_account(changes, &params.creator, meta.block_timestamp).await?;
        creator.link_pool(&params.pool_id);
        changes.save(&creator)?;

        applied(changes)
    }

    pub(crate) async fn on_pool_rate_updated(
        &self,
        meta: &EventMeta,
        params: &PoolRateUpdatedParams,
        changes: &mut Changeset<'_>,
    ) -> Handled {
        let Some(mut pool) = changes.load::<Pool>(params.pool_id.as_str()).await? else {
            warn!(event_key = %key_of(meta), pool = %params.pool_id, "Pool not found, skipping rate update");
            return skipped(SkipReason::MissingPool);
        };

        pool.lending_rate = params.lending_rate;
        pool.borrow_rate = params.borrow_rate;
        pool.utilization = params.utilization;
        pool.updated_at = meta.block_timestamp;
        changes.save(&pool)?;

        applied(changes)
    }
}
