//! Prize pool rows: period lifecycle, contributions, and draw results.

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;

use super::models::{parse_account_id, PoolWinRow};
use super::WalletStore;
use crate::domain::{AccountId, Amount, PeriodKey, PoolWin};
use crate::error::WalletResult;

impl WalletStore {
    /// Creates the period row if it does not exist yet. Safe to call from
    /// every contribution path.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn ensure_period(
        &self,
        exec: impl SqliteExecutor<'_>,
        period: &PeriodKey,
    ) -> WalletResult<()> {
        sqlx::query("INSERT OR IGNORE INTO pool_periods (period, closed) VALUES (?1, 0)")
            .bind(period.as_str())
            .execute(exec)
            .await?;
        Ok(())
    }

    /// Reports whether a period exists and whether it has been drawn.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn period_closed(
        &self,
        exec: impl SqliteExecutor<'_>,
        period: &PeriodKey,
    ) -> WalletResult<Option<bool>> {
        Ok(
            sqlx::query_scalar::<_, bool>("SELECT closed FROM pool_periods WHERE period = ?1")
                .bind(period.as_str())
                .fetch_optional(exec)
                .await?,
        )
    }

    /// Records one contribution against a period, but only while the period
    /// is still open. Returns the number of rows inserted (zero or one);
    /// zero means the period closed before the insert landed.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn insert_contribution_open(
        &self,
        exec: impl SqliteExecutor<'_>,
        period: &PeriodKey,
        account_id: AccountId,
        amount: Amount,
        at: DateTime<Utc>,
    ) -> WalletResult<u64> {
        let result = sqlx::query(
            "INSERT INTO pool_contributions (period, account_id, amount, created_at) \
             SELECT ?1, ?2, ?3, ?4 \
             WHERE EXISTS (SELECT 1 FROM pool_periods WHERE period = ?1 AND closed = 0)",
        )
        .bind(period.as_str())
        .bind(account_id.to_string())
        .bind(amount.minor())
        .bind(at)
        .execute(exec)
        .await?;
        Ok(result.rows_affected())
    }

    /// Sums a period's contributions.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn pool_total(
        &self,
        exec: impl SqliteExecutor<'_>,
        period: &PeriodKey,
    ) -> WalletResult<Amount> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount), 0) FROM pool_contributions WHERE period = ?1",
        )
        .bind(period.as_str())
        .fetch_one(exec)
        .await?;
        Ok(Amount::from_minor(total))
    }

    /// Counts distinct contributing accounts for a period.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn contributor_count(
        &self,
        exec: impl SqliteExecutor<'_>,
        period: &PeriodKey,
    ) -> WalletResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT account_id) FROM pool_contributions WHERE period = ?1",
        )
        .bind(period.as_str())
        .fetch_one(exec)
        .await?)
    }

    /// Lists each distinct contributor once, in first-contribution order.
    /// The draw picks uniformly from this list, so a heavy contributor gets
    /// the same single ticket as a light one.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn distinct_contributors(
        &self,
        exec: impl SqliteExecutor<'_>,
        period: &PeriodKey,
    ) -> WalletResult<Vec<AccountId>> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT account_id FROM pool_contributions WHERE period = ?1 \
             GROUP BY account_id ORDER BY MIN(id)",
        )
        .bind(period.as_str())
        .fetch_all(exec)
        .await?;
        rows.iter().map(|raw| parse_account_id(raw)).collect()
    }

    /// Marks a period drawn, matching only while it is still open. Returns
    /// the number of rows flipped (zero or one); zero means another draw got
    /// there first.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn close_period(
        &self,
        exec: impl SqliteExecutor<'_>,
        period: &PeriodKey,
    ) -> WalletResult<u64> {
        let result =
            sqlx::query("UPDATE pool_periods SET closed = 1 WHERE period = ?1 AND closed = 0")
                .bind(period.as_str())
                .execute(exec)
                .await?;
        Ok(result.rows_affected())
    }

    /// Records the draw result for a closed period.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn insert_pool_win(
        &self,
        exec: impl SqliteExecutor<'_>,
        win: &PoolWin,
    ) -> WalletResult<()> {
        sqlx::query(
            "INSERT INTO pool_wins (period, account_id, amount, participants, won_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(win.period.as_str())
        .bind(win.account_id.to_string())
        .bind(win.amount.minor())
        .bind(win.participants)
        .bind(win.won_at)
        .execute(exec)
        .await?;
        Ok(())
    }

    /// Fetches the draw result for a period, if one has run.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn pool_win_for(
        &self,
        exec: impl SqliteExecutor<'_>,
        period: &PeriodKey,
    ) -> WalletResult<Option<PoolWinRow>> {
        Ok(sqlx::query_as::<_, PoolWinRow>(
            "SELECT period, account_id, amount, participants, won_at \
             FROM pool_wins WHERE period = ?1",
        )
        .bind(period.as_str())
        .fetch_optional(exec)
        .await?)
    }
}
