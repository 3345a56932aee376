//! Database row models and their domain conversions.
//!
//! Row structs mirror the SQLite schema one to one: ids are TEXT, amounts
//! are integer minor units, tags are strings. Conversion into domain types
//! happens at this boundary so a corrupt stored tag surfaces as
//! [`WalletError::Internal`](crate::error::WalletError::Internal) instead of
//! leaking strings upward.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::domain::{
    Account, AccountId, Amount, PaymentMethod, PeriodKey, PoolWin, PromoCode, Tier, Transaction,
    TxId, TxKind, TxStatus,
};
use crate::error::{WalletError, WalletResult};

/// Parses a TEXT uuid column into an [`AccountId`].
pub(super) fn parse_account_id(raw: &str) -> WalletResult<AccountId> {
    AccountId::from_str(raw)
        .map_err(|err| WalletError::Internal(format!("bad account id {raw:?}: {err}")))
}

/// An `accounts` table row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    /// Account uuid as TEXT.
    pub id: String,
    /// Platform reference.
    pub external_id: String,
    /// Optional display name.
    pub display_name: Option<String>,
    /// Balance in minor units.
    pub balance: i64,
    /// Shareable referral code.
    pub referral_code: String,
    /// Referral code this account arrived through.
    pub referred_by: Option<String>,
    /// Accounts referred by this one.
    pub referral_count: i64,
    /// Lifetime referral earnings in minor units.
    pub referral_earnings: i64,
    /// Lifetime wagered total in minor units.
    pub total_wagered: i64,
    /// Lifetime won total in minor units.
    pub total_won: i64,
    /// Tier tag.
    pub tier: String,
    /// Ban flag.
    pub banned: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-activity timestamp.
    pub last_active_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = WalletError;

    fn try_from(row: AccountRow) -> WalletResult<Self> {
        Ok(Self {
            id: parse_account_id(&row.id)?,
            external_id: row.external_id.into(),
            display_name: row.display_name,
            balance: Amount::from_minor(row.balance),
            referral_code: row.referral_code,
            referred_by: row.referred_by,
            referral_count: row.referral_count,
            referral_earnings: Amount::from_minor(row.referral_earnings),
            total_wagered: Amount::from_minor(row.total_wagered),
            total_won: Amount::from_minor(row.total_won),
            tier: Tier::from_str(&row.tier)?,
            banned: row.banned,
            created_at: row.created_at,
            last_active_at: row.last_active_at,
        })
    }
}

/// A `transactions` table row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    /// Autoincrement ledger id.
    pub id: i64,
    /// Owning account uuid as TEXT.
    pub account_id: String,
    /// Kind tag.
    pub kind: String,
    /// Signed amount in minor units.
    pub amount: i64,
    /// Status tag.
    pub status: String,
    /// Method tag, where one applies.
    pub method: Option<String>,
    /// Creation note.
    pub note: String,
    /// Reviewer note.
    pub review_note: Option<String>,
    /// External correlation reference.
    pub reference: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Terminal-transition timestamp.
    pub processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = WalletError;

    fn try_from(row: TransactionRow) -> WalletResult<Self> {
        let method = row
            .method
            .as_deref()
            .map(PaymentMethod::from_str)
            .transpose()?;
        Ok(Self {
            id: TxId::new(row.id),
            account_id: parse_account_id(&row.account_id)?,
            kind: TxKind::from_str(&row.kind)?,
            amount: Amount::from_minor(row.amount),
            status: TxStatus::from_str(&row.status)?,
            method,
            note: row.note,
            review_note: row.review_note,
            reference: row.reference,
            created_at: row.created_at,
            processed_at: row.processed_at,
        })
    }
}

/// Input for a new ledger entry.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// Owning account.
    pub account_id: AccountId,
    /// Entry classification.
    pub kind: TxKind,
    /// Signed delta in minor units; debits negative.
    pub amount: Amount,
    /// Initial status (`Pending` for payment requests, `Completed` for
    /// direct credits).
    pub status: TxStatus,
    /// Fulfilment channel, where one applies.
    pub method: Option<PaymentMethod>,
    /// Free-text creation note.
    pub note: String,
    /// External correlation reference.
    pub reference: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Set when the entry is terminal at creation.
    pub processed_at: Option<DateTime<Utc>>,
}

/// Input for a new promo code. The code text must already be normalized.
#[derive(Debug, Clone)]
pub struct NewPromoCode {
    /// Normalized code string.
    pub code: String,
    /// Grant amount in minor units.
    pub amount: Amount,
    /// Redemption cap.
    pub max_uses: i64,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A `promo_codes` table row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PromoCodeRow {
    /// Autoincrement code id.
    pub id: i64,
    /// Normalized code string.
    pub code: String,
    /// Grant amount in minor units.
    pub amount: i64,
    /// Redemption cap.
    pub max_uses: i64,
    /// Redemptions consumed.
    pub uses: i64,
    /// Active flag.
    pub active: bool,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<PromoCodeRow> for PromoCode {
    fn from(row: PromoCodeRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            amount: Amount::from_minor(row.amount),
            max_uses: row.max_uses,
            uses: row.uses,
            active: row.active,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

/// A `pool_wins` table row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PoolWinRow {
    /// Drawn period key.
    pub period: String,
    /// Winning account uuid as TEXT.
    pub account_id: String,
    /// Payout in minor units.
    pub amount: i64,
    /// Distinct contributors at draw time.
    pub participants: i64,
    /// Draw timestamp.
    pub won_at: DateTime<Utc>,
}

impl TryFrom<PoolWinRow> for PoolWin {
    type Error = WalletError;

    fn try_from(row: PoolWinRow) -> WalletResult<Self> {
        Ok(Self {
            period: PeriodKey::from(row.period),
            account_id: parse_account_id(&row.account_id)?,
            amount: Amount::from_minor(row.amount),
            participants: row.participants,
            won_at: row.won_at,
        })
    }
}
