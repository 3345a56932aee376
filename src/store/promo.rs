//! Promo code rows: creation, redemption bookkeeping, and the guarded
//! use counter that keeps racing redeemers inside `max_uses`.

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;

use super::models::{NewPromoCode, PromoCodeRow};
use super::{is_unique_violation, WalletStore};
use crate::domain::AccountId;
use crate::error::{WalletError, WalletResult};

/// Column list matching [`PromoCodeRow`].
const CODE_COLUMNS: &str = "id, code, amount, max_uses, uses, active, expires_at, created_at";

impl WalletStore {
    /// Inserts a new promo code and returns its assigned id.
    ///
    /// # Errors
    ///
    /// [`WalletError::CodeExists`] when the normalized code is already
    /// registered; persistence errors otherwise.
    pub async fn insert_code(
        &self,
        exec: impl SqliteExecutor<'_>,
        code: &NewPromoCode,
    ) -> WalletResult<i64> {
        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO promo_codes (code, amount, max_uses, uses, active, expires_at, created_at) \
             VALUES (?1, ?2, ?3, 0, 1, ?4, ?5) \
             RETURNING id",
        )
        .bind(&code.code)
        .bind(code.amount.minor())
        .bind(code.max_uses)
        .bind(code.expires_at)
        .bind(code.created_at)
        .fetch_one(exec)
        .await;
        match inserted {
            Ok(id) => Ok(id),
            Err(err) if is_unique_violation(&err) => Err(WalletError::CodeExists(code.code.clone())),
            Err(err) => Err(err.into()),
        }
    }

    /// Fetches a promo code by its normalized text.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn code_by_normalized(
        &self,
        exec: impl SqliteExecutor<'_>,
        code: &str,
    ) -> WalletResult<Option<PromoCodeRow>> {
        let sql = format!("SELECT {CODE_COLUMNS} FROM promo_codes WHERE code = ?1");
        Ok(sqlx::query_as::<_, PromoCodeRow>(&sql)
            .bind(code)
            .fetch_optional(exec)
            .await?)
    }

    /// Claims one use of a code, matching only while uses remain. Returns
    /// the number of rows claimed (zero or one); zero means the code
    /// exhausted between the caller's read and this write.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn try_increment_uses(
        &self,
        exec: impl SqliteExecutor<'_>,
        code_id: i64,
    ) -> WalletResult<u64> {
        let result = sqlx::query(
            "UPDATE promo_codes SET uses = uses + 1 WHERE id = ?1 AND uses < max_uses",
        )
        .bind(code_id)
        .execute(exec)
        .await?;
        Ok(result.rows_affected())
    }

    /// Reports whether the account already redeemed the code.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn usage_exists(
        &self,
        exec: impl SqliteExecutor<'_>,
        code_id: i64,
        account_id: AccountId,
    ) -> WalletResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM promo_redemptions WHERE code_id = ?1 AND account_id = ?2",
        )
        .bind(code_id)
        .bind(account_id.to_string())
        .fetch_one(exec)
        .await?;
        Ok(count > 0)
    }

    /// Records a redemption. The primary key doubles as the once-per-account
    /// guard under concurrency; `code` is only used to label the error.
    ///
    /// # Errors
    ///
    /// [`WalletError::CodeAlreadyUsed`] when this account already holds a
    /// redemption row; persistence errors otherwise.
    pub async fn insert_usage(
        &self,
        exec: impl SqliteExecutor<'_>,
        code_id: i64,
        code: &str,
        account_id: AccountId,
        at: DateTime<Utc>,
    ) -> WalletResult<()> {
        let inserted = sqlx::query(
            "INSERT INTO promo_redemptions (code_id, account_id, redeemed_at) VALUES (?1, ?2, ?3)",
        )
        .bind(code_id)
        .bind(account_id.to_string())
        .bind(at)
        .execute(exec)
        .await;
        match inserted {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(WalletError::CodeAlreadyUsed(code.to_owned()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Flips a code's active flag.
    ///
    /// # Errors
    ///
    /// [`WalletError::CodeNotFound`] when no row matches; persistence errors
    /// otherwise.
    pub async fn set_code_active(
        &self,
        exec: impl SqliteExecutor<'_>,
        code: &str,
        active: bool,
    ) -> WalletResult<()> {
        let result = sqlx::query("UPDATE promo_codes SET active = ?1 WHERE code = ?2")
            .bind(active)
            .bind(code)
            .execute(exec)
            .await?;
        if result.rows_affected() == 0 {
            return Err(WalletError::CodeNotFound(code.to_owned()));
        }
        Ok(())
    }

    /// Lists the most recently created codes, for operator review.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn list_codes(
        &self,
        exec: impl SqliteExecutor<'_>,
        limit: i64,
    ) -> WalletResult<Vec<PromoCodeRow>> {
        let sql = format!("SELECT {CODE_COLUMNS} FROM promo_codes ORDER BY id DESC LIMIT ?1");
        Ok(sqlx::query_as::<_, PromoCodeRow>(&sql)
            .bind(limit)
            .fetch_all(exec)
            .await?)
    }
}
