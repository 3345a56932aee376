//! Referral service: pays the referrer's cut when a deposit completes.

use chrono::Utc;
use sqlx::sqlite::SqliteConnection;

use crate::domain::{Account, Amount, ExternalId, TxKind, TxStatus};
use crate::error::{WalletError, WalletResult};
use crate::service::ledger::record_in_unit;
use crate::store::models::NewTransaction;
use crate::store::WalletStore;

/// What a cascade paid, handed back for post-commit notification.
#[derive(Debug, Clone)]
pub struct ReferralPayout {
    /// Referrer's platform reference.
    pub referrer: ExternalId,
    /// Amount credited to the referrer.
    pub earnings: Amount,
}

/// Computes and applies the deposit cascade inside the deposit-approval
/// unit: the referrer is credited `deposit * percent / 100`, their lifetime
/// earnings figure is bumped, and a completed `referral_credit` entry is
/// appended.
#[derive(Debug, Clone)]
pub struct ReferralService {
    store: WalletStore,
    percent: u32,
}

impl ReferralService {
    /// Creates a new `ReferralService` paying the given percentage.
    #[must_use]
    pub fn new(store: WalletStore, percent: u32) -> Self {
        Self { store, percent }
    }

    /// Returns the configured cascade percentage.
    #[must_use]
    pub fn percent(&self) -> u32 {
        self.percent
    }

    /// Runs the cascade for a completed deposit inside the caller's unit.
    ///
    /// Skips silently when the depositor carries no referring code, the code
    /// no longer resolves, or the computed earnings round to zero. The
    /// caller notifies the returned referrer only after its unit commits.
    pub(crate) async fn cascade(
        &self,
        conn: &mut SqliteConnection,
        depositor: &Account,
        deposit: Amount,
    ) -> WalletResult<Option<ReferralPayout>> {
        let Some(code) = &depositor.referred_by else {
            return Ok(None);
        };
        let Some(row) = self
            .store
            .account_by_referral_code(&mut *conn, code)
            .await?
        else {
            tracing::warn!(code = %code, "referring code no longer resolves, skipping cascade");
            return Ok(None);
        };
        let referrer = Account::try_from(row)?;
        let Some(earnings) = deposit.percent(self.percent) else {
            return Err(WalletError::Internal("referral earnings overflow".to_owned()));
        };
        if earnings.is_zero() {
            return Ok(None);
        }
        let now = Utc::now();
        record_in_unit(
            &self.store,
            &mut *conn,
            NewTransaction {
                account_id: referrer.id,
                kind: TxKind::ReferralCredit,
                amount: earnings,
                status: TxStatus::Completed,
                method: None,
                note: format!("referral earnings from {}", depositor.display_label()),
                reference: None,
                created_at: now,
                processed_at: Some(now),
            },
        )
        .await?;
        self.store
            .add_referral_earnings(&mut *conn, referrer.id, earnings)
            .await?;
        tracing::debug!(referrer = %referrer.id, %earnings, "referral cascade applied");
        Ok(Some(ReferralPayout {
            referrer: referrer.external_id,
            earnings,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::AdminGate;
    use crate::domain::SeedProfile;
    use crate::notify::NotificationBus;
    use crate::service::{testkit, AccountService};

    async fn referred_pair(store: &WalletStore) -> (Account, Account) {
        let accounts = AccountService::new(store.clone(), NotificationBus::new(8), AdminGate::default());
        let Ok(referrer) = accounts
            .get_or_create(&ExternalId::from("u-a"), SeedProfile::default())
            .await
        else {
            panic!("referrer creation should succeed");
        };
        let Ok(depositor) = accounts
            .get_or_create(
                &ExternalId::from("u-b"),
                SeedProfile {
                    display_name: Some("Ben".to_owned()),
                    referred_by_code: Some(referrer.referral_code.clone()),
                },
            )
            .await
        else {
            panic!("depositor creation should succeed");
        };
        (referrer, depositor)
    }

    #[tokio::test]
    async fn cascade_credits_referrer_once() {
        let store = testkit::mem_store().await;
        let svc = ReferralService::new(store.clone(), 10);
        assert_eq!(svc.percent(), 10);
        let (referrer, depositor) = referred_pair(&store).await;

        let Ok(mut unit) = store.begin().await else {
            panic!("unit should open");
        };
        let Ok(Some(payout)) = svc
            .cascade(&mut unit, &depositor, Amount::from_minor(10_000))
            .await
        else {
            panic!("cascade should pay");
        };
        let Ok(()) = unit.commit().await else {
            panic!("unit should commit");
        };

        assert_eq!(payout.referrer, referrer.external_id);
        assert_eq!(payout.earnings, Amount::from_minor(1_000));
        assert_eq!(testkit::balance_of(&store, referrer.id).await, 1_000);

        let Ok(Some(row)) = store.account_by_id(store.pool(), referrer.id).await else {
            panic!("referrer should exist");
        };
        assert_eq!(row.referral_earnings, 1_000);

        let Ok(entries) = store
            .transactions_for_account(store.pool(), referrer.id, 10, 0)
            .await
        else {
            panic!("history should read");
        };
        assert_eq!(entries.len(), 1);
        let Some(entry) = entries.first() else {
            panic!("entry should exist");
        };
        assert_eq!(entry.kind, TxKind::ReferralCredit.as_str());
        assert_eq!(entry.amount, 1_000);
    }

    #[tokio::test]
    async fn cascade_skips_unreferred_depositor() {
        let store = testkit::mem_store().await;
        let svc = ReferralService::new(store.clone(), 10);
        let depositor = testkit::seed(&store, "u-solo", Amount::ZERO).await;

        let Ok(mut unit) = store.begin().await else {
            panic!("unit should open");
        };
        let Ok(outcome) = svc
            .cascade(&mut unit, &depositor, Amount::from_minor(10_000))
            .await
        else {
            panic!("cascade should run");
        };
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn cascade_skips_dangling_code() {
        let store = testkit::mem_store().await;
        let svc = ReferralService::new(store.clone(), 10);
        let mut depositor = testkit::seed(&store, "u-b", Amount::ZERO).await;
        depositor.referred_by = Some("AAAA9999".to_owned());

        let Ok(mut unit) = store.begin().await else {
            panic!("unit should open");
        };
        let Ok(outcome) = svc
            .cascade(&mut unit, &depositor, Amount::from_minor(10_000))
            .await
        else {
            panic!("cascade should run");
        };
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn cascade_skips_zero_rounded_earnings() {
        let store = testkit::mem_store().await;
        let svc = ReferralService::new(store.clone(), 10);
        let (referrer, depositor) = referred_pair(&store).await;

        let Ok(mut unit) = store.begin().await else {
            panic!("unit should open");
        };
        let Ok(outcome) = svc.cascade(&mut unit, &depositor, Amount::from_minor(5)).await else {
            panic!("cascade should run");
        };
        assert!(outcome.is_none());
        drop(unit);
        assert_eq!(testkit::balance_of(&store, referrer.id).await, 0);
    }
}
