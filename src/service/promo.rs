//! Promo code service: operator-issued codes and their redemption.
//!
//! Redemption is first-come-first-served across accounts and once per
//! account. Both guards are enforced twice: a cheap read check for a clear
//! error message, then a conditional write inside the unit that stays
//! correct under racing redeemers.

use chrono::{DateTime, Utc};

use crate::auth::AdminGate;
use crate::domain::{validate_code, Amount, ExternalId, PromoCode, Transaction, TxKind, TxStatus};
use crate::error::{WalletError, WalletResult};
use crate::notify::NotificationBus;
use crate::service::active_account;
use crate::service::ledger::record_in_unit;
use crate::store::models::{NewPromoCode, NewTransaction};
use crate::store::WalletStore;

/// Issues promo codes and settles redemptions.
#[derive(Debug, Clone)]
pub struct PromoService {
    store: WalletStore,
    notifier: NotificationBus,
    gate: AdminGate,
}

impl PromoService {
    /// Creates a new `PromoService`.
    #[must_use]
    pub fn new(store: WalletStore, notifier: NotificationBus, gate: AdminGate) -> Self {
        Self {
            store,
            notifier,
            gate,
        }
    }

    /// Registers a new code. The stored form is the normalized one, so
    /// `welcome50` and `WELCOME50` are the same code.
    ///
    /// # Errors
    ///
    /// [`WalletError::Unauthorized`] when `acting` is not an operator,
    /// [`WalletError::Validation`] for a malformed code, non-positive
    /// amount, or `max_uses < 1`, and [`WalletError::CodeExists`] when the
    /// normalized code is already registered.
    pub async fn create_code(
        &self,
        acting: &ExternalId,
        raw_code: &str,
        amount: Amount,
        max_uses: i64,
        expires_at: Option<DateTime<Utc>>,
    ) -> WalletResult<PromoCode> {
        self.gate.ensure(acting)?;
        let code = validate_code(raw_code)?;
        if !amount.is_positive() {
            return Err(WalletError::validation("promo amount must be positive"));
        }
        if max_uses < 1 {
            return Err(WalletError::validation("promo codes need at least one use"));
        }
        let created_at = Utc::now();
        let new = NewPromoCode {
            code: code.clone(),
            amount,
            max_uses,
            expires_at,
            created_at,
        };
        let id = self.store.insert_code(self.store.pool(), &new).await?;
        tracing::info!(code, %amount, max_uses, "promo code created");
        Ok(PromoCode {
            id,
            code,
            amount,
            max_uses,
            uses: 0,
            active: true,
            expires_at,
            created_at,
        })
    }

    /// Redeems a code for the calling account and credits its amount.
    ///
    /// Inactive and expired codes are indistinguishable from unknown ones.
    ///
    /// # Errors
    ///
    /// [`WalletError::CodeNotFound`], [`WalletError::CodeExhausted`], or
    /// [`WalletError::CodeAlreadyUsed`] depending on which guard refuses;
    /// [`WalletError::Validation`] for malformed input or a banned account.
    pub async fn redeem(
        &self,
        external_id: &ExternalId,
        raw_code: &str,
    ) -> WalletResult<Transaction> {
        let account = active_account(&self.store, external_id).await?;
        let code = validate_code(raw_code)?;
        let now = Utc::now();
        let Some(row) = self.store.code_by_normalized(self.store.pool(), &code).await? else {
            return Err(WalletError::CodeNotFound(code));
        };
        let promo = PromoCode::from(row);
        if !promo.is_live(now) {
            return Err(WalletError::CodeNotFound(promo.code));
        }
        if promo.is_exhausted() {
            return Err(WalletError::CodeExhausted(promo.code));
        }
        if self
            .store
            .usage_exists(self.store.pool(), promo.id, account.id)
            .await?
        {
            return Err(WalletError::CodeAlreadyUsed(promo.code));
        }

        let mut unit = self.store.begin().await?;
        // Re-claim under the unit; a racing redeemer may have taken the
        // last slot since the read above.
        let claimed = self.store.try_increment_uses(&mut *unit, promo.id).await?;
        if claimed == 0 {
            return Err(WalletError::CodeExhausted(promo.code));
        }
        let recorded = record_in_unit(
            &self.store,
            &mut unit,
            NewTransaction {
                account_id: account.id,
                kind: TxKind::CodeRedeem,
                amount: promo.amount,
                status: TxStatus::Completed,
                method: None,
                note: format!("redeemed code {}", promo.code),
                reference: None,
                created_at: now,
                processed_at: Some(now),
            },
        )
        .await?;
        self.store
            .insert_usage(&mut *unit, promo.id, &promo.code, account.id, now)
            .await?;
        unit.commit().await?;
        tracing::info!(
            account = %account.id,
            code = promo.code,
            amount = %promo.amount,
            "promo code redeemed"
        );
        self.notifier.notify(
            external_id,
            format!("Code {} redeemed: {} credited.", promo.code, promo.amount),
        );
        Ok(recorded.transaction)
    }

    /// Lists the most recently created codes.
    ///
    /// # Errors
    ///
    /// [`WalletError::Unauthorized`] when `acting` is not an operator.
    pub async fn list_codes(
        &self,
        acting: &ExternalId,
        limit: i64,
    ) -> WalletResult<Vec<PromoCode>> {
        self.gate.ensure(acting)?;
        let rows = self.store.list_codes(self.store.pool(), limit).await?;
        Ok(rows.into_iter().map(PromoCode::from).collect())
    }

    /// Enables or disables a code. Disabled codes redeem as if unknown and
    /// can be re-enabled later.
    ///
    /// # Errors
    ///
    /// [`WalletError::Unauthorized`] when `acting` is not an operator, and
    /// [`WalletError::CodeNotFound`] for an unregistered code.
    pub async fn set_code_active(
        &self,
        acting: &ExternalId,
        raw_code: &str,
        active: bool,
    ) -> WalletResult<()> {
        self.gate.ensure(acting)?;
        let code = validate_code(raw_code)?;
        self.store
            .set_code_active(self.store.pool(), &code, active)
            .await?;
        tracing::info!(code, active, "promo code toggled");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::service::testkit;

    fn service(store: &WalletStore) -> PromoService {
        PromoService::new(store.clone(), NotificationBus::new(32), testkit::ops_gate())
    }

    fn operator() -> ExternalId {
        ExternalId::from(testkit::OPERATOR)
    }

    #[tokio::test]
    async fn welcome_code_credits_once_per_account() {
        let store = testkit::mem_store().await;
        let svc = service(&store);
        let account = testkit::seed(&store, "u-1", Amount::ZERO).await;

        let Ok(code) = svc
            .create_code(&operator(), "welcome50", Amount::from_minor(5_000), 100, None)
            .await
        else {
            panic!("code creation should succeed");
        };
        assert_eq!(code.code, "WELCOME50");

        let Ok(tx) = svc.redeem(&ExternalId::from("u-1"), "  Welcome50 ").await else {
            panic!("first redemption should succeed");
        };
        assert_eq!(tx.kind, TxKind::CodeRedeem);
        assert_eq!(tx.amount, Amount::from_minor(5_000));
        assert_eq!(testkit::balance_of(&store, account.id).await, 5_000);

        let again = svc.redeem(&ExternalId::from("u-1"), "WELCOME50").await;
        assert!(matches!(again, Err(WalletError::CodeAlreadyUsed(_))));
        assert_eq!(testkit::balance_of(&store, account.id).await, 5_000);

        let Ok(codes) = svc.list_codes(&operator(), 10).await else {
            panic!("listing should succeed");
        };
        assert_eq!(codes.first().map(|c| c.uses), Some(1));
    }

    #[tokio::test]
    async fn exhausted_codes_refuse_further_accounts() {
        let store = testkit::mem_store().await;
        let svc = service(&store);
        testkit::seed(&store, "u-1", Amount::ZERO).await;
        testkit::seed(&store, "u-2", Amount::ZERO).await;

        let Ok(_) = svc
            .create_code(&operator(), "ONCE", Amount::from_minor(1_000), 1, None)
            .await
        else {
            panic!("code creation should succeed");
        };
        let Ok(_) = svc.redeem(&ExternalId::from("u-1"), "ONCE").await else {
            panic!("first redemption should succeed");
        };
        let second = svc.redeem(&ExternalId::from("u-2"), "ONCE").await;
        assert!(matches!(second, Err(WalletError::CodeExhausted(_))));
    }

    #[tokio::test]
    async fn racing_redeemers_stay_within_max_uses() {
        let store = testkit::mem_store().await;
        let svc = service(&store);
        for n in 0..5 {
            testkit::seed(&store, &format!("u-{n}"), Amount::ZERO).await;
        }
        let Ok(_) = svc
            .create_code(&operator(), "LIMITED", Amount::from_minor(1_000), 2, None)
            .await
        else {
            panic!("code creation should succeed");
        };

        let mut handles = Vec::new();
        for n in 0..5 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.redeem(&ExternalId::from(format!("u-{n}")), "LIMITED").await
            }));
        }
        let mut granted = 0;
        for handle in handles {
            let Ok(result) = handle.await else {
                panic!("task should not be cancelled");
            };
            match result {
                Ok(_) => granted += 1,
                Err(WalletError::CodeExhausted(_)) => {}
                Err(err) => panic!("unexpected error: {err}"),
            }
        }
        assert_eq!(granted, 2);

        let Ok(codes) = svc.list_codes(&operator(), 10).await else {
            panic!("listing should succeed");
        };
        assert_eq!(codes.first().map(|c| c.uses), Some(2));
    }

    #[tokio::test]
    async fn disabled_and_expired_codes_look_unknown() {
        let store = testkit::mem_store().await;
        let svc = service(&store);
        testkit::seed(&store, "u-1", Amount::ZERO).await;
        let ext = ExternalId::from("u-1");

        let expired_at = Some(Utc::now() - chrono::Duration::hours(1));
        let Ok(_) = svc
            .create_code(&operator(), "BYGONE", Amount::from_minor(1_000), 5, expired_at)
            .await
        else {
            panic!("code creation should succeed");
        };
        let expired = svc.redeem(&ext, "BYGONE").await;
        assert!(matches!(expired, Err(WalletError::CodeNotFound(_))));

        let Ok(_) = svc
            .create_code(&operator(), "PAUSED", Amount::from_minor(1_000), 5, None)
            .await
        else {
            panic!("code creation should succeed");
        };
        let Ok(()) = svc.set_code_active(&operator(), "PAUSED", false).await else {
            panic!("toggle should succeed");
        };
        let disabled = svc.redeem(&ext, "PAUSED").await;
        assert!(matches!(disabled, Err(WalletError::CodeNotFound(_))));

        let Ok(()) = svc.set_code_active(&operator(), "PAUSED", true).await else {
            panic!("toggle should succeed");
        };
        let Ok(_) = svc.redeem(&ext, "PAUSED").await else {
            panic!("re-enabled code should redeem");
        };
    }

    #[tokio::test]
    async fn creation_enforces_shape_and_uniqueness() {
        let store = testkit::mem_store().await;
        let svc = service(&store);

        let malformed = svc
            .create_code(&operator(), "no spaces!", Amount::from_minor(1_000), 1, None)
            .await;
        assert!(matches!(malformed, Err(WalletError::Validation(_))));

        let zero = svc
            .create_code(&operator(), "FREE0", Amount::ZERO, 1, None)
            .await;
        assert!(matches!(zero, Err(WalletError::Validation(_))));

        let Ok(_) = svc
            .create_code(&operator(), "TAKEN", Amount::from_minor(1_000), 1, None)
            .await
        else {
            panic!("code creation should succeed");
        };
        let duplicate = svc
            .create_code(&operator(), "taken", Amount::from_minor(2_000), 1, None)
            .await;
        assert!(matches!(duplicate, Err(WalletError::CodeExists(_))));

        let uncovered = svc
            .create_code(&ExternalId::from("mallory"), "SNEAK", Amount::from_minor(1), 1, None)
            .await;
        assert!(matches!(uncovered, Err(WalletError::Unauthorized(_))));
    }
}
