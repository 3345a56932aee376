//! Account rows: lookups, creation, and serialized balance mutation.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::SqliteExecutor;

use super::models::AccountRow;
use super::WalletStore;
use crate::domain::{Account, AccountId, Amount, ExternalId, Tier};
use crate::error::{WalletError, WalletResult};

/// Column list matching [`AccountRow`].
const ACCOUNT_COLUMNS: &str = "id, external_id, display_name, balance, referral_code, \
     referred_by, referral_count, referral_earnings, total_wagered, total_won, tier, \
     banned, created_at, last_active_at";

impl WalletStore {
    /// Inserts a freshly created account.
    ///
    /// # Errors
    ///
    /// Surfaces uniqueness violations (raced first contact, referral-code
    /// collision) as persistence errors for the caller to classify.
    pub async fn insert_account(
        &self,
        exec: impl SqliteExecutor<'_>,
        account: &Account,
    ) -> WalletResult<()> {
        sqlx::query(
            "INSERT INTO accounts (id, external_id, display_name, balance, referral_code, \
             referred_by, referral_count, referral_earnings, total_wagered, total_won, tier, \
             banned, created_at, last_active_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(account.id.to_string())
        .bind(account.external_id.as_str())
        .bind(account.display_name.as_deref())
        .bind(account.balance.minor())
        .bind(&account.referral_code)
        .bind(account.referred_by.as_deref())
        .bind(account.referral_count)
        .bind(account.referral_earnings.minor())
        .bind(account.total_wagered.minor())
        .bind(account.total_won.minor())
        .bind(account.tier.as_str())
        .bind(account.banned)
        .bind(account.created_at)
        .bind(account.last_active_at)
        .execute(exec)
        .await?;
        Ok(())
    }

    /// Fetches an account by its platform reference.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn account_by_external(
        &self,
        exec: impl SqliteExecutor<'_>,
        external_id: &ExternalId,
    ) -> WalletResult<Option<AccountRow>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE external_id = ?1");
        Ok(sqlx::query_as::<_, AccountRow>(&sql)
            .bind(external_id.as_str())
            .fetch_optional(exec)
            .await?)
    }

    /// Fetches an account by internal id.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn account_by_id(
        &self,
        exec: impl SqliteExecutor<'_>,
        account_id: AccountId,
    ) -> WalletResult<Option<AccountRow>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1");
        Ok(sqlx::query_as::<_, AccountRow>(&sql)
            .bind(account_id.to_string())
            .fetch_optional(exec)
            .await?)
    }

    /// Fetches the account owning a referral code.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn account_by_referral_code(
        &self,
        exec: impl SqliteExecutor<'_>,
        code: &str,
    ) -> WalletResult<Option<AccountRow>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE referral_code = ?1");
        Ok(sqlx::query_as::<_, AccountRow>(&sql)
            .bind(code)
            .fetch_optional(exec)
            .await?)
    }

    /// Stamps the account's last-activity timestamp.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn touch_last_active(
        &self,
        exec: impl SqliteExecutor<'_>,
        account_id: AccountId,
        at: DateTime<Utc>,
    ) -> WalletResult<()> {
        sqlx::query("UPDATE accounts SET last_active_at = ?1 WHERE id = ?2")
            .bind(at)
            .bind(account_id.to_string())
            .execute(exec)
            .await?;
        Ok(())
    }

    /// Refreshes the display name when the platform supplies a new one.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn update_display_name(
        &self,
        exec: impl SqliteExecutor<'_>,
        account_id: AccountId,
        display_name: &str,
    ) -> WalletResult<()> {
        sqlx::query("UPDATE accounts SET display_name = ?1 WHERE id = ?2")
            .bind(display_name)
            .bind(account_id.to_string())
            .execute(exec)
            .await?;
        Ok(())
    }

    /// Applies a signed delta to the account balance, serialized per row.
    ///
    /// The update only matches while the resulting balance stays
    /// non-negative, so concurrent debits cannot race each other below
    /// zero. Returns the balance after the delta.
    ///
    /// # Errors
    ///
    /// [`WalletError::InsufficientFunds`] when the guarded update matches no
    /// row but the account exists; [`WalletError::AccountNotFound`] when it
    /// does not; persistence errors otherwise.
    pub async fn adjust_balance(
        &self,
        conn: &mut SqliteConnection,
        account_id: AccountId,
        delta: Amount,
    ) -> WalletResult<Amount> {
        let updated = sqlx::query_scalar::<_, i64>(
            "UPDATE accounts SET balance = balance + ?1 \
             WHERE id = ?2 AND balance + ?1 >= 0 \
             RETURNING balance",
        )
        .bind(delta.minor())
        .bind(account_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
        if let Some(balance) = updated {
            return Ok(Amount::from_minor(balance));
        }
        let existing = sqlx::query_scalar::<_, i64>("SELECT balance FROM accounts WHERE id = ?1")
            .bind(account_id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        match existing {
            None => Err(WalletError::AccountNotFound(account_id.to_string())),
            Some(balance) => Err(WalletError::InsufficientFunds {
                balance: Amount::from_minor(balance),
                requested: delta.abs(),
            }),
        }
    }

    /// Counts one more account arriving through this account's code.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn increment_referral_count(
        &self,
        exec: impl SqliteExecutor<'_>,
        account_id: AccountId,
    ) -> WalletResult<()> {
        sqlx::query("UPDATE accounts SET referral_count = referral_count + 1 WHERE id = ?1")
            .bind(account_id.to_string())
            .execute(exec)
            .await?;
        Ok(())
    }

    /// Adds a cascade payout to the referrer's lifetime earnings figure.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn add_referral_earnings(
        &self,
        exec: impl SqliteExecutor<'_>,
        account_id: AccountId,
        earnings: Amount,
    ) -> WalletResult<()> {
        sqlx::query(
            "UPDATE accounts SET referral_earnings = referral_earnings + ?1 WHERE id = ?2",
        )
        .bind(earnings.minor())
        .bind(account_id.to_string())
        .execute(exec)
        .await?;
        Ok(())
    }

    /// Sets or clears the ban flag.
    ///
    /// # Errors
    ///
    /// [`WalletError::AccountNotFound`] when no row matches; persistence
    /// errors otherwise.
    pub async fn set_banned(
        &self,
        exec: impl SqliteExecutor<'_>,
        account_id: AccountId,
        banned: bool,
    ) -> WalletResult<()> {
        let result = sqlx::query("UPDATE accounts SET banned = ?1 WHERE id = ?2")
            .bind(banned)
            .bind(account_id.to_string())
            .execute(exec)
            .await?;
        if result.rows_affected() == 0 {
            return Err(WalletError::AccountNotFound(account_id.to_string()));
        }
        Ok(())
    }

    /// Adds a settled wager to the lifetime totals and stores the tier the
    /// new wagered total earns.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn add_wager_totals(
        &self,
        exec: impl SqliteExecutor<'_>,
        account_id: AccountId,
        stake: Amount,
        payout: Amount,
        tier: Tier,
    ) -> WalletResult<()> {
        sqlx::query(
            "UPDATE accounts SET total_wagered = total_wagered + ?1, \
             total_won = total_won + ?2, tier = ?3 WHERE id = ?4",
        )
        .bind(stake.minor())
        .bind(payout.minor())
        .bind(tier.as_str())
        .bind(account_id.to_string())
        .execute(exec)
        .await?;
        Ok(())
    }

    /// Lists every account's platform reference, for broadcast fan-out.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn list_external_ids(
        &self,
        exec: impl SqliteExecutor<'_>,
    ) -> WalletResult<Vec<ExternalId>> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT external_id FROM accounts ORDER BY created_at",
        )
        .fetch_all(exec)
        .await?;
        Ok(rows.into_iter().map(ExternalId::from).collect())
    }
}
