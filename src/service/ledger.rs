//! Ledger service: the append/transition engine every money flow runs on.
//!
//! The free functions here are the in-unit primitives other services call
//! inside their own store units; [`LedgerService`] wraps them for the
//! operations that stand alone (admin adjustments, history, retention).

use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqliteConnection;

use crate::auth::AdminGate;
use crate::domain::{
    Account, AccountId, Amount, ExternalId, PaymentMethod, Transaction, TxId, TxKind, TxStatus,
};
use crate::error::{WalletError, WalletResult};
use crate::notify::NotificationBus;
use crate::store::models::NewTransaction;
use crate::store::WalletStore;

/// Outcome of [`record_in_unit`]: the appended entry and, when the entry
/// carried a balance effect, the balance after it.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    /// The entry as appended.
    pub transaction: Transaction,
    /// Balance after the delta, when one was applied.
    pub new_balance: Option<Amount>,
}

/// Appends a ledger entry inside the caller's unit and applies its balance
/// delta when the entry is completed at creation and its kind carries one.
/// Record-only kinds and pending entries leave the balance untouched.
pub(crate) async fn record_in_unit(
    store: &WalletStore,
    conn: &mut SqliteConnection,
    new: NewTransaction,
) -> WalletResult<Recorded> {
    let new_balance = if new.status == TxStatus::Completed
        && new.kind.applies_balance()
        && !new.amount.is_zero()
    {
        Some(store.adjust_balance(&mut *conn, new.account_id, new.amount).await?)
    } else {
        None
    };
    let id = store.insert_transaction(&mut *conn, &new).await?;
    Ok(Recorded {
        transaction: Transaction {
            id,
            account_id: new.account_id,
            kind: new.kind,
            amount: new.amount,
            status: new.status,
            method: new.method,
            note: new.note,
            review_note: None,
            reference: new.reference,
            created_at: new.created_at,
            processed_at: new.processed_at,
        },
        new_balance,
    })
}

/// Moves a pending entry to a terminal status inside the caller's unit and
/// applies the status-specific balance effect: a completed credit applies
/// its delta, a failed or cancelled withdrawal refunds its hold, everything
/// else leaves the balance alone. Returns the updated entry and the balance
/// after any effect.
pub(crate) async fn transition_in_unit(
    store: &WalletStore,
    conn: &mut SqliteConnection,
    id: TxId,
    new_status: TxStatus,
    review_note: Option<&str>,
    at: DateTime<Utc>,
) -> WalletResult<(Transaction, Option<Amount>)> {
    if !new_status.is_terminal() {
        return Err(WalletError::validation("transition target must be terminal"));
    }
    let Some(row) = store.transaction_by_id(&mut *conn, id).await? else {
        return Err(WalletError::TransactionNotFound(id));
    };
    let mut tx = Transaction::try_from(row)?;
    if !tx.is_pending() {
        return Err(WalletError::InvalidStateTransition {
            id,
            status: tx.status,
        });
    }
    let new_balance = match (tx.kind, new_status) {
        // The hold was taken at request time; failing the request gives it back.
        (TxKind::Withdraw, TxStatus::Failed | TxStatus::Cancelled) => {
            Some(store.adjust_balance(&mut *conn, tx.account_id, tx.amount.abs()).await?)
        }
        (TxKind::Withdraw, TxStatus::Completed) => None,
        (kind, TxStatus::Completed) if kind.applies_balance() => {
            Some(store.adjust_balance(&mut *conn, tx.account_id, tx.amount).await?)
        }
        _ => None,
    };
    let flipped = store
        .mark_processed(&mut *conn, id, new_status, at, review_note)
        .await?;
    if flipped == 0 {
        let status = match store.transaction_by_id(&mut *conn, id).await? {
            Some(fresh) => Transaction::try_from(fresh)?.status,
            None => return Err(WalletError::TransactionNotFound(id)),
        };
        return Err(WalletError::InvalidStateTransition { id, status });
    }
    tx.status = new_status;
    tx.review_note = review_note.map(ToOwned::to_owned);
    tx.processed_at = Some(at);
    Ok((tx, new_balance))
}

/// Standalone ledger operations: direct admin adjustments, history reads,
/// and the retention sweep.
#[derive(Debug, Clone)]
pub struct LedgerService {
    store: WalletStore,
    notifier: NotificationBus,
    gate: AdminGate,
}

impl LedgerService {
    /// Creates a new `LedgerService`.
    #[must_use]
    pub fn new(store: WalletStore, notifier: NotificationBus, gate: AdminGate) -> Self {
        Self {
            store,
            notifier,
            gate,
        }
    }

    /// Applies a signed balance adjustment immediately, bypassing the
    /// pending workflow. The entry is completed at creation; a debit that
    /// would take the balance negative aborts with nothing written.
    ///
    /// # Errors
    ///
    /// [`WalletError::Unauthorized`] when `acting` is not an operator,
    /// [`WalletError::AccountNotFound`] for an unknown account,
    /// [`WalletError::InsufficientFunds`] on an uncovered debit, and
    /// [`WalletError::Validation`] for a zero amount.
    pub async fn admin_adjust(
        &self,
        acting: &ExternalId,
        account_id: AccountId,
        amount: Amount,
        note: &str,
    ) -> WalletResult<Transaction> {
        self.gate.ensure(acting)?;
        if amount.is_zero() {
            return Err(WalletError::validation("adjustment amount must be non-zero"));
        }
        let Some(row) = self.store.account_by_id(self.store.pool(), account_id).await? else {
            return Err(WalletError::AccountNotFound(account_id.to_string()));
        };
        let account = Account::try_from(row)?;
        let now = Utc::now();
        let mut unit = self.store.begin().await?;
        let recorded = record_in_unit(
            &self.store,
            &mut unit,
            NewTransaction {
                account_id: account.id,
                kind: TxKind::AdminAdjustment,
                amount,
                status: TxStatus::Completed,
                method: Some(PaymentMethod::Manual),
                note: note.to_owned(),
                reference: None,
                created_at: now,
                processed_at: Some(now),
            },
        )
        .await?;
        unit.commit().await?;
        tracing::info!(account = %account.id, %amount, "admin adjustment applied");
        self.notifier.notify(
            &account.external_id,
            format!("Your balance was adjusted by {amount}: {note}"),
        );
        Ok(recorded.transaction)
    }

    /// Fetches one ledger entry.
    ///
    /// # Errors
    ///
    /// [`WalletError::TransactionNotFound`] when no entry matches.
    pub async fn transaction(&self, id: TxId) -> WalletResult<Transaction> {
        let Some(row) = self.store.transaction_by_id(self.store.pool(), id).await? else {
            return Err(WalletError::TransactionNotFound(id));
        };
        Ok(Transaction::try_from(row)?)
    }

    /// Returns a page of an account's entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn history(
        &self,
        account_id: AccountId,
        limit: i64,
        offset: i64,
    ) -> WalletResult<Vec<Transaction>> {
        let rows = self
            .store
            .transactions_for_account(self.store.pool(), account_id, limit, offset)
            .await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    /// Deletes terminal entries older than the retention window. Pending
    /// entries are kept regardless of age. Returns the purged row count.
    ///
    /// # Errors
    ///
    /// [`WalletError::Validation`] when the window cannot be represented;
    /// persistence errors otherwise.
    pub async fn purge_older_than(&self, days: u64) -> WalletResult<u64> {
        let Some(window) = i64::try_from(days).ok().and_then(Duration::try_days) else {
            return Err(WalletError::validation("retention window out of range"));
        };
        let cutoff = Utc::now() - window;
        let purged = self
            .store
            .purge_settled_before(self.store.pool(), cutoff)
            .await?;
        tracing::info!(purged, "retention sweep complete");
        Ok(purged)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::service::testkit;

    fn service(store: &WalletStore) -> LedgerService {
        LedgerService::new(store.clone(), NotificationBus::new(8), testkit::ops_gate())
    }

    #[tokio::test]
    async fn admin_adjust_credits_balance_and_records_entry() {
        let store = testkit::mem_store().await;
        let svc = service(&store);
        let account = testkit::seed(&store, "u-1", Amount::ZERO).await;

        let result = svc
            .admin_adjust(
                &ExternalId::from(testkit::OPERATOR),
                account.id,
                Amount::from_minor(2_500),
                "goodwill credit",
            )
            .await;
        let Ok(tx) = result else {
            panic!("adjustment should apply");
        };
        assert_eq!(tx.kind, TxKind::AdminAdjustment);
        assert_eq!(tx.status, TxStatus::Completed);
        assert_eq!(tx.amount, Amount::from_minor(2_500));
        assert_eq!(testkit::balance_of(&store, account.id).await, 2_500);
    }

    #[tokio::test]
    async fn admin_adjust_refuses_uncovered_debit_without_entry() {
        let store = testkit::mem_store().await;
        let svc = service(&store);
        let account = testkit::seed(&store, "u-1", Amount::from_minor(1_000)).await;

        let result = svc
            .admin_adjust(
                &ExternalId::from(testkit::OPERATOR),
                account.id,
                Amount::from_minor(-2_000),
                "clawback",
            )
            .await;
        assert!(matches!(result, Err(WalletError::InsufficientFunds { .. })));
        assert_eq!(testkit::balance_of(&store, account.id).await, 1_000);
        let Ok(entries) = svc.history(account.id, 10, 0).await else {
            panic!("history should read");
        };
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn admin_adjust_requires_operator() {
        let store = testkit::mem_store().await;
        let svc = service(&store);
        let account = testkit::seed(&store, "u-1", Amount::ZERO).await;

        let result = svc
            .admin_adjust(
                &ExternalId::from("mallory"),
                account.id,
                Amount::from_minor(100),
                "nope",
            )
            .await;
        assert!(matches!(result, Err(WalletError::Unauthorized(_))));
        assert_eq!(testkit::balance_of(&store, account.id).await, 0);
    }

    #[tokio::test]
    async fn admin_adjust_rejects_zero_amount() {
        let store = testkit::mem_store().await;
        let svc = service(&store);
        let account = testkit::seed(&store, "u-1", Amount::ZERO).await;

        let result = svc
            .admin_adjust(
                &ExternalId::from(testkit::OPERATOR),
                account.id,
                Amount::ZERO,
                "noop",
            )
            .await;
        assert!(matches!(result, Err(WalletError::Validation(_))));
    }

    #[tokio::test]
    async fn history_pages_newest_first() {
        let store = testkit::mem_store().await;
        let svc = service(&store);
        let account = testkit::seed(&store, "u-1", Amount::ZERO).await;
        let operator = ExternalId::from(testkit::OPERATOR);

        for minor in [100, 200, 300] {
            let Ok(_) = svc
                .admin_adjust(&operator, account.id, Amount::from_minor(minor), "step")
                .await
            else {
                panic!("adjustment should apply");
            };
        }

        let Ok(first_page) = svc.history(account.id, 2, 0).await else {
            panic!("history should read");
        };
        let amounts: Vec<i64> = first_page.iter().map(|tx| tx.amount.minor()).collect();
        assert_eq!(amounts, vec![300, 200]);

        let Ok(second_page) = svc.history(account.id, 2, 2).await else {
            panic!("history should read");
        };
        let amounts: Vec<i64> = second_page.iter().map(|tx| tx.amount.minor()).collect();
        assert_eq!(amounts, vec![100]);
    }

    #[tokio::test]
    async fn purge_drops_old_settled_entries_but_never_pending() {
        let store = testkit::mem_store().await;
        let svc = service(&store);
        let account = testkit::seed(&store, "u-1", Amount::ZERO).await;
        let now = Utc::now();

        let entry = |age_days: i64, status: TxStatus| NewTransaction {
            account_id: account.id,
            kind: TxKind::Deposit,
            amount: Amount::from_minor(500),
            status,
            method: Some(PaymentMethod::Bank),
            note: String::new(),
            reference: None,
            created_at: now - Duration::days(age_days),
            processed_at: None,
        };
        for new in [
            entry(40, TxStatus::Completed),
            entry(1, TxStatus::Completed),
            entry(40, TxStatus::Pending),
        ] {
            let Ok(_) = store.insert_transaction(store.pool(), &new).await else {
                panic!("entry should insert");
            };
        }

        let Ok(purged) = svc.purge_older_than(30).await else {
            panic!("purge should run");
        };
        assert_eq!(purged, 1);

        let Ok(remaining) = svc.history(account.id, 10, 0).await else {
            panic!("history should read");
        };
        assert_eq!(remaining.len(), 2);
        assert!(remaining
            .iter()
            .any(|tx| tx.status == TxStatus::Pending));
    }

    #[tokio::test]
    async fn transition_refuses_settled_entries() {
        let store = testkit::mem_store().await;
        let account = testkit::seed(&store, "u-1", Amount::ZERO).await;
        let now = Utc::now();

        let Ok(id) = store
            .insert_transaction(
                store.pool(),
                &NewTransaction {
                    account_id: account.id,
                    kind: TxKind::Deposit,
                    amount: Amount::from_minor(500),
                    status: TxStatus::Completed,
                    method: Some(PaymentMethod::Bank),
                    note: String::new(),
                    reference: None,
                    created_at: now,
                    processed_at: Some(now),
                },
            )
            .await
        else {
            panic!("entry should insert");
        };

        let Ok(mut unit) = store.begin().await else {
            panic!("unit should open");
        };
        let result =
            transition_in_unit(&store, &mut unit, id, TxStatus::Failed, None, Utc::now()).await;
        assert!(matches!(
            result,
            Err(WalletError::InvalidStateTransition {
                status: TxStatus::Completed,
                ..
            })
        ));
    }
}
