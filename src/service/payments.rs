//! Payment service: the request/review workflow for deposits and
//! withdrawals.
//!
//! Deposits wait in `pending` with no balance effect until an operator
//! approves them. Withdrawals debit the balance the moment the request is
//! accepted (the hold), so racing requests from one account can never
//! over-withdraw; rejection refunds exactly the hold.

use chrono::Utc;

use crate::auth::AdminGate;
use crate::config::{MethodLimits, PaymentLimits};
use crate::domain::{
    short_token, Account, Amount, ExternalId, PaymentMethod, Transaction, TxId, TxKind, TxStatus,
};
use crate::error::{WalletError, WalletResult};
use crate::notify::NotificationBus;
use crate::service::active_account;
use crate::service::ledger::{record_in_unit, transition_in_unit};
use crate::service::referrals::ReferralService;
use crate::store::models::NewTransaction;
use crate::store::WalletStore;

/// Orchestrates payment requests and their operator review.
#[derive(Debug, Clone)]
pub struct PaymentService {
    store: WalletStore,
    notifier: NotificationBus,
    gate: AdminGate,
    limits: MethodLimits,
    referrals: ReferralService,
}

impl PaymentService {
    /// Creates a new `PaymentService`.
    #[must_use]
    pub fn new(
        store: WalletStore,
        notifier: NotificationBus,
        gate: AdminGate,
        limits: MethodLimits,
        referrals: ReferralService,
    ) -> Self {
        Self {
            store,
            notifier,
            gate,
            limits,
            referrals,
        }
    }

    /// Records a pending deposit request. The balance is untouched until an
    /// operator approves.
    ///
    /// # Errors
    ///
    /// [`WalletError::Validation`] for a banned account, an unsupported
    /// method, or an amount outside the method's window;
    /// [`WalletError::AccountNotFound`] for an unknown account.
    pub async fn request_deposit(
        &self,
        external_id: &ExternalId,
        method: PaymentMethod,
        amount: Amount,
    ) -> WalletResult<Transaction> {
        let account = active_account(&self.store, external_id).await?;
        let window = self.window(method)?;
        if !amount.is_positive() || amount < window.deposit_min || amount > window.deposit_max {
            return Err(WalletError::validation(format!(
                "deposits via {method} accept {} to {}",
                window.deposit_min, window.deposit_max
            )));
        }
        let now = Utc::now();
        let reference = short_token();
        let mut unit = self.store.begin().await?;
        let recorded = record_in_unit(
            &self.store,
            &mut unit,
            NewTransaction {
                account_id: account.id,
                kind: TxKind::Deposit,
                amount,
                status: TxStatus::Pending,
                method: Some(method),
                note: format!("deposit via {method}"),
                reference: Some(reference.clone()),
                created_at: now,
                processed_at: None,
            },
        )
        .await?;
        unit.commit().await?;
        tracing::info!(
            account = %account.id,
            %amount,
            method = %method,
            reference,
            "deposit requested"
        );
        self.notifier.notify(
            external_id,
            format!("Deposit request {reference} for {amount} received, awaiting review."),
        );
        self.alert_operators(&format!(
            "Deposit request {reference}: {amount} via {method} from {}",
            account.display_label()
        ));
        Ok(recorded.transaction)
    }

    /// Records a pending withdrawal request and immediately holds the
    /// amount. The hold comes back only through rejection.
    ///
    /// # Errors
    ///
    /// [`WalletError::InsufficientFunds`] when the balance cannot cover the
    /// hold; otherwise as [`Self::request_deposit`].
    pub async fn request_withdraw(
        &self,
        external_id: &ExternalId,
        method: PaymentMethod,
        amount: Amount,
    ) -> WalletResult<Transaction> {
        let account = active_account(&self.store, external_id).await?;
        let window = self.window(method)?;
        if !amount.is_positive() || amount < window.withdraw_min || amount > window.withdraw_max {
            return Err(WalletError::validation(format!(
                "withdrawals via {method} accept {} to {}",
                window.withdraw_min, window.withdraw_max
            )));
        }
        let Some(hold) = amount.checked_neg() else {
            return Err(WalletError::Internal("withdrawal amount overflow".to_owned()));
        };
        let now = Utc::now();
        let reference = short_token();
        let mut unit = self.store.begin().await?;
        self.store.adjust_balance(&mut unit, account.id, hold).await?;
        let recorded = record_in_unit(
            &self.store,
            &mut unit,
            NewTransaction {
                account_id: account.id,
                kind: TxKind::Withdraw,
                amount: hold,
                status: TxStatus::Pending,
                method: Some(method),
                note: format!("withdrawal via {method}"),
                reference: Some(reference.clone()),
                created_at: now,
                processed_at: None,
            },
        )
        .await?;
        unit.commit().await?;
        tracing::info!(
            account = %account.id,
            %amount,
            method = %method,
            reference,
            "withdrawal requested and held"
        );
        self.notifier.notify(
            external_id,
            format!("Withdrawal request {reference} for {amount} received; the amount is on hold."),
        );
        self.alert_operators(&format!(
            "Withdrawal request {reference}: {amount} via {method} from {}",
            account.display_label()
        ));
        Ok(recorded.transaction)
    }

    /// Approves a pending request: a deposit credits the account and runs
    /// the referral cascade, a withdrawal just settles (its hold already
    /// happened). All effects land in one unit.
    ///
    /// # Errors
    ///
    /// [`WalletError::Unauthorized`] when `acting` is not an operator,
    /// [`WalletError::TransactionNotFound`] for an unknown entry, and
    /// [`WalletError::InvalidStateTransition`] when the entry is not
    /// pending.
    pub async fn approve(&self, acting: &ExternalId, id: TxId) -> WalletResult<Transaction> {
        self.gate.ensure(acting)?;
        let now = Utc::now();
        let mut unit = self.store.begin().await?;
        let (tx, _) =
            transition_in_unit(&self.store, &mut unit, id, TxStatus::Completed, None, now).await?;
        if !matches!(tx.kind, TxKind::Deposit | TxKind::Withdraw) {
            return Err(WalletError::validation("only payment requests can be reviewed"));
        }
        let owner = self.owner_in_unit(&mut unit, &tx).await?;
        let payout = if tx.kind == TxKind::Deposit {
            self.referrals.cascade(&mut unit, &owner, tx.amount).await?
        } else {
            None
        };
        unit.commit().await?;
        tracing::info!(transaction = %id, kind = %tx.kind, "payment request approved");
        match tx.kind {
            TxKind::Withdraw => self.notifier.notify(
                &owner.external_id,
                format!("Withdrawal of {} approved and paid out.", tx.amount.abs()),
            ),
            _ => self.notifier.notify(
                &owner.external_id,
                format!("Deposit of {} approved and credited.", tx.amount),
            ),
        }
        if let Some(payout) = payout {
            self.notifier.notify(
                &payout.referrer,
                format!(
                    "Referral bonus {} credited for a deposit by {}.",
                    payout.earnings,
                    owner.display_label()
                ),
            );
        }
        Ok(tx)
    }

    /// Rejects a pending request with a reason: a deposit settles with no
    /// balance effect, a withdrawal refunds exactly its hold.
    ///
    /// # Errors
    ///
    /// As [`Self::approve`].
    pub async fn reject(
        &self,
        acting: &ExternalId,
        id: TxId,
        reason: &str,
    ) -> WalletResult<Transaction> {
        self.gate.ensure(acting)?;
        let now = Utc::now();
        let mut unit = self.store.begin().await?;
        let (tx, _) =
            transition_in_unit(&self.store, &mut unit, id, TxStatus::Failed, Some(reason), now)
                .await?;
        if !matches!(tx.kind, TxKind::Deposit | TxKind::Withdraw) {
            return Err(WalletError::validation("only payment requests can be reviewed"));
        }
        let owner = self.owner_in_unit(&mut unit, &tx).await?;
        unit.commit().await?;
        tracing::info!(transaction = %id, kind = %tx.kind, reason, "payment request rejected");
        match tx.kind {
            TxKind::Withdraw => self.notifier.notify(
                &owner.external_id,
                format!(
                    "Withdrawal rejected: {reason}. The held {} was returned to your balance.",
                    tx.amount.abs()
                ),
            ),
            _ => self.notifier.notify(
                &owner.external_id,
                format!("Deposit request rejected: {reason}."),
            ),
        }
        Ok(tx)
    }

    /// Lists pending deposit requests, oldest first.
    ///
    /// # Errors
    ///
    /// [`WalletError::Unauthorized`] when `acting` is not an operator.
    pub async fn pending_deposits(
        &self,
        acting: &ExternalId,
        limit: i64,
    ) -> WalletResult<Vec<Transaction>> {
        self.review_queue(acting, TxKind::Deposit, limit).await
    }

    /// Lists pending withdrawal requests, oldest first.
    ///
    /// # Errors
    ///
    /// [`WalletError::Unauthorized`] when `acting` is not an operator.
    pub async fn pending_withdrawals(
        &self,
        acting: &ExternalId,
        limit: i64,
    ) -> WalletResult<Vec<Transaction>> {
        self.review_queue(acting, TxKind::Withdraw, limit).await
    }

    async fn review_queue(
        &self,
        acting: &ExternalId,
        kind: TxKind,
        limit: i64,
    ) -> WalletResult<Vec<Transaction>> {
        self.gate.ensure(acting)?;
        let rows = self
            .store
            .pending_by_kind(self.store.pool(), kind, limit)
            .await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn owner_in_unit(
        &self,
        conn: &mut sqlx::SqliteConnection,
        tx: &Transaction,
    ) -> WalletResult<Account> {
        let Some(row) = self.store.account_by_id(&mut *conn, tx.account_id).await? else {
            return Err(WalletError::AccountNotFound(tx.account_id.to_string()));
        };
        Account::try_from(row)
    }

    fn window(&self, method: PaymentMethod) -> WalletResult<&PaymentLimits> {
        self.limits.for_method(method).ok_or_else(|| {
            WalletError::validation(format!("{method} is not a requestable payment channel"))
        })
    }

    fn alert_operators(&self, text: &str) {
        for admin in self.gate.roster() {
            self.notifier.notify(admin, text);
        }
    }
}
