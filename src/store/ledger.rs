//! Transaction rows: append, status flips, and history reads.

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;

use super::models::{NewTransaction, TransactionRow};
use super::WalletStore;
use crate::domain::{AccountId, TxId, TxKind, TxStatus};
use crate::error::WalletResult;

/// Column list matching [`TransactionRow`].
const TX_COLUMNS: &str = "id, account_id, kind, amount, status, method, note, \
     review_note, reference, created_at, processed_at";

impl WalletStore {
    /// Appends a ledger entry and returns its assigned id.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn insert_transaction(
        &self,
        exec: impl SqliteExecutor<'_>,
        tx: &NewTransaction,
    ) -> WalletResult<TxId> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO transactions (account_id, kind, amount, status, method, note, \
             reference, created_at, processed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             RETURNING id",
        )
        .bind(tx.account_id.to_string())
        .bind(tx.kind.as_str())
        .bind(tx.amount.minor())
        .bind(tx.status.as_str())
        .bind(tx.method.map(|m| m.as_str()))
        .bind(&tx.note)
        .bind(tx.reference.as_deref())
        .bind(tx.created_at)
        .bind(tx.processed_at)
        .fetch_one(exec)
        .await?;
        Ok(TxId::new(id))
    }

    /// Fetches a single ledger entry.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn transaction_by_id(
        &self,
        exec: impl SqliteExecutor<'_>,
        id: TxId,
    ) -> WalletResult<Option<TransactionRow>> {
        let sql = format!("SELECT {TX_COLUMNS} FROM transactions WHERE id = ?1");
        Ok(sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(id.value())
            .fetch_optional(exec)
            .await?)
    }

    /// Moves a pending entry to a terminal status, recording when and
    /// optionally why. Matches nothing if the entry already left `pending`,
    /// so a raced double review resolves to a single winner.
    ///
    /// Returns the number of rows flipped (zero or one).
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn mark_processed(
        &self,
        exec: impl SqliteExecutor<'_>,
        id: TxId,
        status: TxStatus,
        at: DateTime<Utc>,
        review_note: Option<&str>,
    ) -> WalletResult<u64> {
        let result = sqlx::query(
            "UPDATE transactions SET status = ?1, processed_at = ?2, review_note = ?3 \
             WHERE id = ?4 AND status = 'pending'",
        )
        .bind(status.as_str())
        .bind(at)
        .bind(review_note)
        .bind(id.value())
        .execute(exec)
        .await?;
        Ok(result.rows_affected())
    }

    /// Returns a page of an account's entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn transactions_for_account(
        &self,
        exec: impl SqliteExecutor<'_>,
        account_id: AccountId,
        limit: i64,
        offset: i64,
    ) -> WalletResult<Vec<TransactionRow>> {
        let sql = format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE account_id = ?1 \
             ORDER BY id DESC LIMIT ?2 OFFSET ?3"
        );
        Ok(sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(account_id.to_string())
            .bind(limit)
            .bind(offset)
            .fetch_all(exec)
            .await?)
    }

    /// Returns pending entries of one kind, oldest first, for review queues.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn pending_by_kind(
        &self,
        exec: impl SqliteExecutor<'_>,
        kind: TxKind,
        limit: i64,
    ) -> WalletResult<Vec<TransactionRow>> {
        let sql = format!(
            "SELECT {TX_COLUMNS} FROM transactions \
             WHERE status = 'pending' AND kind = ?1 ORDER BY id LIMIT ?2"
        );
        Ok(sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(kind.as_str())
            .bind(limit)
            .fetch_all(exec)
            .await?)
    }

    /// Deletes settled entries older than the cutoff. Pending entries are
    /// never purged regardless of age.
    ///
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn purge_settled_before(
        &self,
        exec: impl SqliteExecutor<'_>,
        cutoff: DateTime<Utc>,
    ) -> WalletResult<u64> {
        let result = sqlx::query(
            "DELETE FROM transactions WHERE status != 'pending' AND created_at < ?1",
        )
        .bind(cutoff)
        .execute(exec)
        .await?;
        Ok(result.rows_affected())
    }
}
