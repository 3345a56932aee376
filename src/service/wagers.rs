//! Wager settlement: the game reports an outcome, the wallet records it.
//!
//! Stakes live on the game side until settlement. A win credits the payout;
//! a loss writes a record-only entry so history stays complete without
//! touching the balance. Either way the cumulative wagered total grows and
//! the tier is recomputed in the same unit, and the prize pool skims its
//! share of the stake afterwards.

use chrono::Utc;

use crate::domain::{Amount, ExternalId, Tier, Transaction, TxKind, TxStatus};
use crate::error::{WalletError, WalletResult};
use crate::notify::NotificationBus;
use crate::service::active_account;
use crate::service::ledger::record_in_unit;
use crate::service::pool::PoolService;
use crate::store::models::NewTransaction;
use crate::store::WalletStore;

/// Settles reported wager outcomes against the ledger.
#[derive(Debug, Clone)]
pub struct WagerService {
    store: WalletStore,
    notifier: NotificationBus,
    pool: PoolService,
}

impl WagerService {
    /// Creates a new `WagerService` feeding the given prize pool.
    #[must_use]
    pub fn new(store: WalletStore, notifier: NotificationBus, pool: PoolService) -> Self {
        Self {
            store,
            notifier,
            pool,
        }
    }

    /// Records one settled wager: `payout > 0` credits a win, otherwise a
    /// record-only loss entry is written. Wagered totals and the tier move
    /// in the same unit; the pool contribution follows as its own unit.
    ///
    /// # Errors
    ///
    /// [`WalletError::Validation`] for a non-positive stake, negative
    /// payout, or banned account; [`WalletError::AccountNotFound`] for an
    /// unknown account.
    pub async fn settle(
        &self,
        external_id: &ExternalId,
        stake: Amount,
        payout: Amount,
    ) -> WalletResult<Transaction> {
        if !stake.is_positive() {
            return Err(WalletError::validation("stake must be positive"));
        }
        if payout.is_negative() {
            return Err(WalletError::validation("payout cannot be negative"));
        }
        let account = active_account(&self.store, external_id).await?;
        let now = Utc::now();

        let mut unit = self.store.begin().await?;
        let recorded = if payout.is_positive() {
            record_in_unit(
                &self.store,
                &mut unit,
                NewTransaction {
                    account_id: account.id,
                    kind: TxKind::WagerWin,
                    amount: payout,
                    status: TxStatus::Completed,
                    method: None,
                    note: format!("wager win on a {stake} stake"),
                    reference: None,
                    created_at: now,
                    processed_at: Some(now),
                },
            )
            .await?
        } else {
            let Some(loss) = stake.checked_neg() else {
                return Err(WalletError::Internal("stake overflow".to_owned()));
            };
            record_in_unit(
                &self.store,
                &mut unit,
                NewTransaction {
                    account_id: account.id,
                    kind: TxKind::WagerLoss,
                    amount: loss,
                    status: TxStatus::Completed,
                    method: None,
                    note: format!("wager lost on a {stake} stake"),
                    reference: None,
                    created_at: now,
                    processed_at: Some(now),
                },
            )
            .await?
        };
        let Some(new_wagered) = account.total_wagered.checked_add(stake) else {
            return Err(WalletError::Internal("wagered total overflow".to_owned()));
        };
        let tier = Tier::for_wagered(new_wagered);
        self.store
            .add_wager_totals(&mut *unit, account.id, stake, payout, tier)
            .await?;
        unit.commit().await?;
        tracing::info!(
            account = %account.id,
            %stake,
            %payout,
            tier = %tier,
            "wager settled"
        );

        // The settlement is already committed; a failed skim must not bubble
        // up and invite a retry that would settle twice.
        if let Err(err) = self.pool.contribute(account.id, stake).await {
            tracing::warn!(account = %account.id, %err, "pool contribution failed");
        }

        if payout.is_positive() {
            self.notifier.notify(
                external_id,
                format!("Wager settled: {payout} credited to your balance."),
            );
        }
        if tier > account.tier {
            self.notifier
                .notify(external_id, format!("Tier up! You are now {tier}."));
        }
        Ok(recorded.transaction)
    }
}
