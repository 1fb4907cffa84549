//! Curator lifecycle and depositor balance transitions.

use super::{
    applied, key_of, load_or_create_account, skipped, Handled, ProjectionError, Projector,
    SkipReason,
};
use crate::domain::{
    Amount, Balance, Curator, CuratorDeployedParams, CuratorUpdatedParams, DepositParams,
    EventMeta, TransferParams, UserBalanceUpdatedParams, WithdrawParams,
};
use crate::store::Changeset;
use tracing::{info, warn};

/// Decrement that never goes below zero. Underflow is logged as an invariant violation.
fn decrement(meta: &EventMeta, field: &'static str, current: Amount, by: Amount) -> Amount {
    let (value, underflow) = current.clamped_sub(by);
    if let Some(u) = underflow {
        warn!(
            event_key = %key_of(meta),
            field,
            current = %u.current,
            requested = %u.requested,
            "InvariantViolation: decrement below zero, clamped"
        );
    }
    value
}

impl Projector {
    /// Refresh `totalAssets` / `totalShares`. A failed read keeps the previous value.
    pub(crate) async fn refresh_totals(&self, meta: &EventMeta, curator: &mut Curator) {
        match self.chain.total_assets(&curator.id).await {
            Ok(value) => curator.total_assets = value,
            Err(e) => {
                warn!(event_key = %key_of(meta), curator = %curator.id, error = %e, "totalAssets read failed, keeping previous value")
            }
        }
        match self.chain.total_supply(&curator.id).await {
            Ok(value) => curator.total_shares = value,
            Err(e) => {
                warn!(event_key = %key_of(meta), curator = %curator.id, error = %e, "totalSupply read failed, keeping previous value")
            }
        }
    }

    /// Load the emitting curator, refresh its totals and recompute its APR.
    ///
    /// Returns `None` (after logging) when the curator was never deployed.
    async fn touch_curator(
        &self,
        meta: &EventMeta,
        changes: &mut Changeset<'_>,
    ) -> Result<Option<Curator>, ProjectionError> {
        let Some(mut curator) = changes.load::<Curator>(meta.contract.as_str()).await? else {
            warn!(event_key = %key_of(meta), curator = %meta.contract, "Curator not found, skipping event");
            return Ok(None);
        };
        self.refresh_totals(meta, &mut curator).await;
        self.recompute_apr(meta, &mut curator, changes).await?;
        curator.updated_at = meta.block_timestamp;
        changes.save(&curator)?;
        Ok(Some(curator))
    }

    /// Deposit, CuratorDeposit and PublicDeposit.
    pub(crate) async fn on_deposit(
        &self,
        meta: &EventMeta,
        params: &DepositParams,
        changes: &mut Changeset<'_>,
    ) -> Handled {
        if self.touch_curator(meta, changes).await?.is_none() {
            return skipped(SkipReason::MissingCurator);
        }

        let vault = &meta.contract;
        let beneficiary = &params.owner;
        let key = Balance::key(vault, beneficiary);

        let mut account = load_or_create_account(changes, beneficiary, meta.block_timestamp).await?;
        account.link_balance(&key);
        changes.save(&account)?;

        let mut balance = changes
            .load::<Balance>(&key)
            .await?
            .unwrap_or_else(|| Balance::new(vault.clone(), beneficiary.clone(), meta.block_timestamp));
        balance.balance = balance.balance.saturating_add(params.assets);
        balance.shares = balance.shares.saturating_add(params.shares);
        balance.total_deposited = balance.total_deposited.saturating_add(params.assets);
        balance.updated_at = meta.block_timestamp;
        changes.save(&balance)?;

        applied(changes)
    }

    pub(crate) async fn on_withdraw(
        &self,
        meta: &EventMeta,
        params: &WithdrawParams,
        changes: &mut Changeset<'_>,
    ) -> Handled {
        if self.touch_curator(meta, changes).await?.is_none() {
            return skipped(SkipReason::MissingCurator);
        }

        let key = Balance::key(&meta.contract, &params.owner);
        let Some(mut balance) = changes.load::<Balance>(&key).await? else {
            warn!(event_key = %key_of(meta), balance = %key, "Balance not found for withdraw");
            return skipped(SkipReason::MissingBalance);
        };

        balance.balance = decrement(meta, "balance", balance.balance, params.assets);
        balance.shares = decrement(meta, "shares", balance.shares, params.shares);
        balance.total_withdrawn = balance.total_withdrawn.saturating_add(params.assets);
        balance.updated_at = meta.block_timestamp;
        changes.save(&balance)?;

        applied(changes)
    }

    /// Share transfer between holders. Mints and burns are covered by deposit/withdraw.
    pub(crate) async fn on_transfer(
        &self,
        meta: &EventMeta,
        params: &TransferParams,
        changes: &mut Changeset<'_>,
    ) -> Handled {
        if params.from.is_zero() || params.to.is_zero() {
            return skipped(SkipReason::MintOrBurn);
        }
        let vault = &meta.contract;

        let sender_key = Balance::key(vault, &params.from);
        match changes.load::<Balance>(&sender_key).await? {
            Some(mut sender) => {
                sender.shares = decrement(meta, "shares", sender.shares, params.value);
                sender.updated_at = meta.block_timestamp;
                changes.save(&sender)?;
            }
            None => {
                warn!(event_key = %key_of(meta), balance = %sender_key, "Sender balance not found, crediting receiver only");
            }
        }

        let receiver_key = Balance::key(vault, &params.to);
        let mut account = load_or_create_account(changes, &params.to, meta.block_timestamp).await?;
        account.link_balance(&receiver_key);
        changes.save(&account)?;

        let mut receiver = changes
            .load::<Balance>(&receiver_key)
            .await?
            .unwrap_or_else(|| Balance::new(vault.clone(), params.to.clone(), meta.block_timestamp));
        receiver.shares = receiver.shares.saturating_add(params.value);
        receiver.updated_at = meta.block_timestamp;
        changes.save(&receiver)?;

        applied(changes)
    }

    /// Authoritative balance override from the vault.
    pub(crate) async fn on_user_balance_updated(
        &self,
        meta: &EventMeta,
        params: &UserBalanceUpdatedParams,
        changes: &mut Changeset<'_>,
    ) -> Handled {
        if self.touch_curator(meta, changes).await?.is_none() {
            return skipped(SkipReason::MissingCurator);
        }

        let vault = &meta.contract;
        let key = Balance::key(vault, &params.user);

        let mut account = load_or_create_account(changes, &params.user, meta.block_timestamp).await?;
        account.link_balance(&key);
        changes.save(&account)?;

        let mut balance = changes
            .load::<Balance>(&key)
            .await?
            .unwrap_or_else(|| Balance::new(vault.clone(), params.user.clone(), meta.block_timestamp));
        balance.balance = params.balance;
        balance.total_deposited = params.total_deposited;
        balance.total_withdrawn = params.total_withdrawn;
        balance.updated_at = meta.block_timestamp;
        changes.save(&balance)?;

        applied(changes)
    }

    pub(crate) async fn on_curator_updated(
        &self,
        meta: &EventMeta,
        params: &CuratorUpdatedParams,
        changes: &mut Changeset<'_>,
    ) -> Handled {
        let Some(mut curator) = changes.load::<Curator>(meta.contract.as_str()).await? else {
            warn!(event_key = %key_of(meta), curator = %meta.contract, "Curator not found, skipping update");
            return skipped(SkipReason::MissingCurator);
        };

        if let Some(name) = &params.name {
            curator.name = name.clone();
        }
        if let Some(symbol) = &params.symbol {
            curator.symbol = symbol.clone();
        }
        if let Some(fee) = params.performance_fee {
            curator.performance_fee = Some(fee);
        }
        if let Some(recipient) = &params.fee_recipient {
            curator.fee_recipient = Some(recipient.clone());
        }

        self.refresh_totals(meta, &mut curator).await;
        self.recompute_apr(meta, &mut curator, changes).await?;
        curator.updated_at = meta.block_timestamp;
        changes.save(&curator)?;

        applied(changes)
    }

    /// Factory event creating a new curator vault.
    pub(crate) async fn on_curator_deployed(
        &self,
        meta: &EventMeta,
        params: &CuratorDeployedParams,
        changes: &mut Changeset<'_>,
    ) -> Handled {
        if changes.exists::<Curator>(params.curator.as_str()).await? {
            info!(event_key = %key_of(meta), curator = %params.curator, "Curator already deployed");
            return skipped(SkipReason::AlreadyExists);
        }

        let curator = Curator::new(
            params.curator.clone(),
            params.asset.clone(),
            params.name.clone(),
            params.symbol.clone(),
            params.creator.clone(),
            meta.block_timestamp,
        );
        changes.save(&curator)?;

        let mut creator = load_or_create_account(changes, &params.creator, meta.block_timestamp).await?;
        creator.link_curator(&params.curator);
        changes.save(&creator)?;

        info!(curator = %params.curator, creator = %params.creator, "Curator deployed");
        applied(changes)
    }
}
