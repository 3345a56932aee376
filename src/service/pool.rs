//! Prize-pool service: wager skims accumulate per period, one draw pays
//! the whole pot to a uniformly chosen contributor.
//!
//! The draw and the payout land in one unit, keyed on the conditional
//! period close: whichever draw flips `closed` first owns the payout, and
//! every later attempt sees zero rows and backs off. Contributions insert
//! only while the period is open, so nothing slips in under a draw.

use chrono::Utc;
use rand::seq::SliceRandom;

use crate::auth::AdminGate;
use crate::domain::{
    Account, AccountId, Amount, PeriodKey, PoolStatus, PoolWin, TxKind, TxStatus,
};
use crate::error::{WalletError, WalletResult};
use crate::notify::NotificationBus;
use crate::service::ledger::record_in_unit;
use crate::store::models::NewTransaction;
use crate::store::WalletStore;

/// Accumulates wager skims and runs period draws.
#[derive(Debug, Clone)]
pub struct PoolService {
    store: WalletStore,
    notifier: NotificationBus,
    gate: AdminGate,
    rate_bps: u32,
    min_total: Amount,
}

impl PoolService {
    /// Creates a new `PoolService` skimming `rate_bps` basis points of every
    /// settled stake, paying out only once a period holds `min_total`.
    #[must_use]
    pub fn new(
        store: WalletStore,
        notifier: NotificationBus,
        gate: AdminGate,
        rate_bps: u32,
        min_total: Amount,
    ) -> Self {
        Self {
            store,
            notifier,
            gate,
            rate_bps,
            min_total,
        }
    }

    /// Returns the period key wagers contribute to right now.
    #[must_use]
    pub fn current_period(&self) -> PeriodKey {
        PeriodKey::daily(Utc::now())
    }

    /// Skims the configured share of a settled stake into the current
    /// period. Returns the skim, or `None` when it rounds to zero or the
    /// period closed before the contribution landed.
    ///
    /// The ledger entry is record-only: the skim comes out of the house
    /// margin, not the player's balance.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub(crate) async fn contribute(
        &self,
        account_id: AccountId,
        stake: Amount,
    ) -> WalletResult<Option<Amount>> {
        let Some(skim) = stake.basis_points(self.rate_bps) else {
            return Err(WalletError::Internal("pool contribution overflow".to_owned()));
        };
        if skim.is_zero() {
            return Ok(None);
        }
        let period = self.current_period();
        let now = Utc::now();
        self.store.ensure_period(self.store.pool(), &period).await?;

        let mut unit = self.store.begin().await?;
        let inserted = self
            .store
            .insert_contribution_open(&mut *unit, &period, account_id, skim, now)
            .await?;
        if inserted == 0 {
            tracing::warn!(%period, account = %account_id, "period closed before contribution");
            return Ok(None);
        }
        record_in_unit(
            &self.store,
            &mut unit,
            NewTransaction {
                account_id,
                kind: TxKind::PoolContribution,
                amount: skim,
                status: TxStatus::Completed,
                method: None,
                note: format!("pool skim for {period}"),
                reference: None,
                created_at: now,
                processed_at: Some(now),
            },
        )
        .await?;
        unit.commit().await?;
        tracing::debug!(%period, account = %account_id, %skim, "pool contribution recorded");
        Ok(Some(skim))
    }

    /// Draws a period: closes it, picks one contributor uniformly, and
    /// credits the full pool total. Returns `None` when there is nothing to
    /// pay: unknown or already-drawn period, or a total still under the
    /// threshold (the period then stays open and keeps accumulating).
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn draw(&self, period: &PeriodKey) -> WalletResult<Option<PoolWin>> {
        match self.store.period_closed(self.store.pool(), period).await? {
            Some(false) => {}
            Some(true) | None => return Ok(None),
        }
        let now = Utc::now();

        let mut unit = self.store.begin().await?;
        if self.store.close_period(&mut *unit, period).await? == 0 {
            return Ok(None);
        }
        let total = self.store.pool_total(&mut *unit, period).await?;
        if total < self.min_total {
            // Dropping the unit rolls the close back; the period keeps
            // accumulating until the next draw attempt.
            tracing::info!(%period, %total, threshold = %self.min_total, "pool below threshold");
            return Ok(None);
        }
        let contributors = self.store.distinct_contributors(&mut *unit, period).await?;
        let winner_id = {
            let mut rng = rand::thread_rng();
            contributors.choose(&mut rng).copied()
        };
        let Some(winner_id) = winner_id else {
            return Ok(None);
        };
        record_in_unit(
            &self.store,
            &mut unit,
            NewTransaction {
                account_id: winner_id,
                kind: TxKind::PoolWin,
                amount: total,
                status: TxStatus::Completed,
                method: None,
                note: format!("prize pool draw {period}"),
                reference: None,
                created_at: now,
                processed_at: Some(now),
            },
        )
        .await?;
        let win = PoolWin {
            period: period.clone(),
            account_id: winner_id,
            amount: total,
            participants: i64::try_from(contributors.len()).unwrap_or(i64::MAX),
            won_at: now,
        };
        self.store.insert_pool_win(&mut *unit, &win).await?;
        let Some(row) = self.store.account_by_id(&mut *unit, winner_id).await? else {
            return Err(WalletError::AccountNotFound(winner_id.to_string()));
        };
        let winner = Account::try_from(row)?;
        unit.commit().await?;

        tracing::info!(
            %period,
            winner = %winner_id,
            %total,
            participants = win.participants,
            "prize pool drawn"
        );
        self.notifier.notify(
            &winner.external_id,
            format!("You won the {period} prize pool: {total}!"),
        );
        for admin in self.gate.roster() {
            self.notifier.notify(
                admin,
                format!(
                    "Prize pool {period} paid {total} to {} ({} contributors).",
                    winner.display_label(),
                    win.participants
                ),
            );
        }
        Ok(Some(win))
    }

    /// Snapshot of a period's accumulation for display surfaces.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn status(&self, period: &PeriodKey) -> WalletResult<PoolStatus> {
        let total = self.store.pool_total(self.store.pool(), period).await?;
        let contributors = self
            .store
            .contributor_count(self.store.pool(), period)
            .await?;
        let closed = self
            .store
            .period_closed(self.store.pool(), period)
            .await?
            .unwrap_or(false);
        Ok(PoolStatus {
            period: period.clone(),
            total,
            contributors,
            threshold: self.min_total,
            closed,
        })
    }

    /// Fetches the recorded result of a past draw.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn win_for(&self, period: &PeriodKey) -> WalletResult<Option<PoolWin>> {
        let Some(row) = self.store.pool_win_for(self.store.pool(), period).await? else {
            return Ok(None);
        };
        Ok(Some(PoolWin::try_from(row)?))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::service::testkit;

    fn service(store: &WalletStore, rate_bps: u32, min_total: i64) -> PoolService {
        PoolService::new(
            store.clone(),
            NotificationBus::new(32),
            testkit::ops_gate(),
            rate_bps,
            Amount::from_minor(min_total),
        )
    }

    #[tokio::test]
    async fn contributions_accumulate_without_touching_balances() {
        let store = testkit::mem_store().await;
        let svc = service(&store, 500, 100);
        let a = testkit::seed(&store, "u-a", Amount::from_minor(10_000)).await;
        let b = testkit::seed(&store, "u-b", Amount::from_minor(10_000)).await;

        let Ok(skim_a) = svc.contribute(a.id, Amount::from_minor(10_000)).await else {
            panic!("contribution should succeed");
        };
        assert_eq!(skim_a, Some(Amount::from_minor(500)));
        let Ok(skim_b) = svc.contribute(b.id, Amount::from_minor(20_000)).await else {
            panic!("contribution should succeed");
        };
        assert_eq!(skim_b, Some(Amount::from_minor(1_000)));

        // Record-only: the skim never debits the player.
        assert_eq!(testkit::balance_of(&store, a.id).await, 10_000);
        assert_eq!(testkit::balance_of(&store, b.id).await, 10_000);

        let Ok(status) = svc.status(&svc.current_period()).await else {
            panic!("status should read");
        };
        assert_eq!(status.total, Amount::from_minor(1_500));
        assert_eq!(status.contributors, 2);
        assert!(!status.closed);

        let Ok(entries) = store
            .transactions_for_account(store.pool(), a.id, 10, 0)
            .await
        else {
            panic!("history should read");
        };
        assert_eq!(
            entries.first().map(|e| e.kind.clone()),
            Some(TxKind::PoolContribution.as_str().to_owned())
        );
    }

    #[tokio::test]
    async fn tiny_stakes_round_to_no_contribution() {
        let store = testkit::mem_store().await;
        let svc = service(&store, 500, 100);
        let a = testkit::seed(&store, "u-a", Amount::from_minor(1_000)).await;

        let Ok(skim) = svc.contribute(a.id, Amount::from_minor(10)).await else {
            panic!("contribution call should succeed");
        };
        assert_eq!(skim, None);

        let Ok(status) = svc.status(&svc.current_period()).await else {
            panic!("status should read");
        };
        assert_eq!(status.total, Amount::ZERO);
        assert_eq!(status.contributors, 0);
    }

    #[tokio::test]
    async fn draw_below_threshold_leaves_the_period_open() {
        let store = testkit::mem_store().await;
        let svc = service(&store, 500, 1_000_000);
        let a = testkit::seed(&store, "u-a", Amount::from_minor(10_000)).await;
        let Ok(_) = svc.contribute(a.id, Amount::from_minor(10_000)).await else {
            panic!("contribution should succeed");
        };

        let period = svc.current_period();
        let Ok(result) = svc.draw(&period).await else {
            panic!("draw call should succeed");
        };
        assert!(result.is_none());

        let Ok(status) = svc.status(&period).await else {
            panic!("status should read");
        };
        assert!(!status.closed);

        // Still open: further contributions keep landing.
        let Ok(more) = svc.contribute(a.id, Amount::from_minor(10_000)).await else {
            panic!("contribution should succeed");
        };
        assert_eq!(more, Some(Amount::from_minor(500)));
    }

    #[tokio::test]
    async fn draw_pays_the_full_pool_to_one_contributor() {
        let store = testkit::mem_store().await;
        let svc = service(&store, 500, 100);
        let a = testkit::seed(&store, "u-a", Amount::from_minor(10_000)).await;
        let b = testkit::seed(&store, "u-b", Amount::from_minor(20_000)).await;
        let Ok(_) = svc.contribute(a.id, Amount::from_minor(10_000)).await else {
            panic!("contribution should succeed");
        };
        let Ok(_) = svc.contribute(b.id, Amount::from_minor(20_000)).await else {
            panic!("contribution should succeed");
        };

        let period = svc.current_period();
        let Ok(Some(win)) = svc.draw(&period).await else {
            panic!("draw should pay out");
        };
        assert_eq!(win.amount, Amount::from_minor(1_500));
        assert_eq!(win.participants, 2);
        assert!(win.account_id == a.id || win.account_id == b.id);

        let a_bal = testkit::balance_of(&store, a.id).await;
        let b_bal = testkit::balance_of(&store, b.id).await;
        if win.account_id == a.id {
            assert_eq!(a_bal, 11_500);
            assert_eq!(b_bal, 20_000);
        } else {
            assert_eq!(a_bal, 10_000);
            assert_eq!(b_bal, 21_500);
        }

        let Ok(status) = svc.status(&period).await else {
            panic!("status should read");
        };
        assert!(status.closed);
        let Ok(recorded) = svc.win_for(&period).await else {
            panic!("win lookup should read");
        };
        assert_eq!(recorded, Some(win));
    }

    #[tokio::test]
    async fn a_period_draws_at_most_once() {
        let store = testkit::mem_store().await;
        let svc = service(&store, 500, 100);
        let a = testkit::seed(&store, "u-a", Amount::from_minor(10_000)).await;
        let Ok(_) = svc.contribute(a.id, Amount::from_minor(10_000)).await else {
            panic!("contribution should succeed");
        };

        let period = svc.current_period();
        let Ok(Some(_)) = svc.draw(&period).await else {
            panic!("first draw should pay out");
        };
        let balance_after_first = testkit::balance_of(&store, a.id).await;

        let Ok(second) = svc.draw(&period).await else {
            panic!("second draw call should succeed");
        };
        assert!(second.is_none());
        assert_eq!(testkit::balance_of(&store, a.id).await, balance_after_first);
    }

    #[tokio::test]
    async fn closed_periods_skip_late_contributions() {
        let store = testkit::mem_store().await;
        let svc = service(&store, 500, 100);
        let a = testkit::seed(&store, "u-a", Amount::from_minor(10_000)).await;
        let Ok(_) = svc.contribute(a.id, Amount::from_minor(10_000)).await else {
            panic!("contribution should succeed");
        };
        let period = svc.current_period();
        let Ok(Some(_)) = svc.draw(&period).await else {
            panic!("draw should pay out");
        };

        let Ok(late) = svc.contribute(a.id, Amount::from_minor(10_000)).await else {
            panic!("late contribution call should succeed");
        };
        assert!(late.is_none());

        let Ok(status) = svc.status(&period).await else {
            panic!("status should read");
        };
        assert_eq!(status.total, Amount::from_minor(500));
    }
}
