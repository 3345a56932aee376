//! Ledger entry types.
//!
//! A [`Transaction`] is one append-only row in the wallet ledger: every
//! balance-affecting event produces exactly one entry carrying the signed
//! delta it applied (or, for record-only kinds, the audited figure). Entries
//! move status forward only: `pending` → `completed` | `failed` | `cancelled`,
//! all three terminal.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Amount, TxId};

/// Error produced when decoding a stored tag string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what} tag: {value:?}")]
pub struct TagParseError {
    /// Which tag family failed to parse.
    pub what: &'static str,
    /// The offending stored value.
    pub value: String,
}

/// Classification of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    /// Money entering the wallet, pending until approved.
    Deposit,
    /// Money leaving the wallet, held at request time.
    Withdraw,
    /// Referral cascade payout to a referrer.
    ReferralCredit,
    /// Outgoing half of a peer gift (negative amount).
    GiftSent,
    /// Incoming half of a peer gift.
    GiftReceived,
    /// Promo code grant.
    CodeRedeem,
    /// Direct admin balance correction, signed.
    AdminAdjustment,
    /// Prize-pool skim taken from a wager; record-only.
    PoolContribution,
    /// Prize-pool payout to the period winner.
    PoolWin,
    /// Externally settled wager payout.
    WagerWin,
    /// Externally settled lost stake; record-only.
    WagerLoss,
}

impl TxKind {
    /// Returns the stored tag string for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::ReferralCredit => "referral_credit",
            Self::GiftSent => "gift_sent",
            Self::GiftReceived => "gift_received",
            Self::CodeRedeem => "code_redeem",
            Self::AdminAdjustment => "admin_adjustment",
            Self::PoolContribution => "pool_contribution",
            Self::PoolWin => "pool_win",
            Self::WagerWin => "wager_win",
            Self::WagerLoss => "wager_loss",
        }
    }

    /// Whether an entry of this kind carries a balance delta at all.
    ///
    /// `pool_contribution` is house-funded and `wager_loss` books a stake
    /// that was wagered on the external gaming platform; both are recorded
    /// for audit without ever touching the account balance.
    #[must_use]
    pub const fn applies_balance(&self) -> bool {
        !matches!(self, Self::PoolContribution | Self::WagerLoss)
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxKind {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdraw" => Ok(Self::Withdraw),
            "referral_credit" => Ok(Self::ReferralCredit),
            "gift_sent" => Ok(Self::GiftSent),
            "gift_received" => Ok(Self::GiftReceived),
            "code_redeem" => Ok(Self::CodeRedeem),
            "admin_adjustment" => Ok(Self::AdminAdjustment),
            "pool_contribution" => Ok(Self::PoolContribution),
            "pool_win" => Ok(Self::PoolWin),
            "wager_win" => Ok(Self::WagerWin),
            "wager_loss" => Ok(Self::WagerLoss),
            other => Err(TagParseError {
                what: "transaction kind",
                value: other.to_owned(),
            }),
        }
    }
}

/// Lifecycle status of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Awaiting an explicit approve/reject decision.
    Pending,
    /// Applied and final.
    Completed,
    /// Rejected; any hold has been released.
    Failed,
    /// Withdrawn before decision; same side effects as `Failed`.
    Cancelled,
}

impl TxStatus {
    /// Returns the stored tag string for this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether this status accepts no further transition.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxStatus {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(TagParseError {
                what: "transaction status",
                value: other.to_owned(),
            }),
        }
    }
}

/// Channel through which a payment request is fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Bank transfer.
    Bank,
    /// Mobile-money wallet.
    MobileMoney,
    /// Cryptocurrency transfer.
    Crypto,
    /// Admin-originated entry with no external channel.
    Manual,
}

impl PaymentMethod {
    /// Returns the stored tag string for this method.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::MobileMoney => "mobile_money",
            Self::Crypto => "crypto",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bank" => Ok(Self::Bank),
            "mobile_money" => Ok(Self::MobileMoney),
            "crypto" => Ok(Self::Crypto),
            "manual" => Ok(Self::Manual),
            other => Err(TagParseError {
                what: "payment method",
                value: other.to_owned(),
            }),
        }
    }
}

/// One append-only ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Ledger row id, quoted by admins in approve/reject calls.
    pub id: TxId,
    /// Owning account.
    pub account_id: AccountId,
    /// Entry classification.
    pub kind: TxKind,
    /// Signed delta in minor units; debits are negative.
    pub amount: Amount,
    /// Lifecycle status.
    pub status: TxStatus,
    /// Fulfilment channel, where one applies.
    pub method: Option<PaymentMethod>,
    /// Free-text note written at creation.
    pub note: String,
    /// Note written by the reviewing admin at approve/reject time.
    pub review_note: Option<String>,
    /// Short external correlation reference for payment requests.
    pub reference: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the terminal transition, if one happened.
    pub processed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Whether this entry still awaits an approve/reject decision.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, TxStatus::Pending)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_round_trip() {
        let kinds = [
            TxKind::Deposit,
            TxKind::Withdraw,
            TxKind::ReferralCredit,
            TxKind::GiftSent,
            TxKind::GiftReceived,
            TxKind::CodeRedeem,
            TxKind::AdminAdjustment,
            TxKind::PoolContribution,
            TxKind::PoolWin,
            TxKind::WagerWin,
            TxKind::WagerLoss,
        ];
        for kind in kinds {
            assert_eq!(kind.as_str().parse::<TxKind>().ok(), Some(kind));
        }
        assert!("jackpot".parse::<TxKind>().is_err());
    }

    #[test]
    fn record_only_kinds_skip_balance() {
        assert!(!TxKind::PoolContribution.applies_balance());
        assert!(!TxKind::WagerLoss.applies_balance());
        assert!(TxKind::Deposit.applies_balance());
        assert!(TxKind::AdminAdjustment.applies_balance());
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!TxStatus::Pending.is_terminal());
        assert!(TxStatus::Completed.is_terminal());
        assert!(TxStatus::Failed.is_terminal());
        assert!(TxStatus::Cancelled.is_terminal());
    }

    #[test]
    fn status_tags_round_trip() {
        for status in [
            TxStatus::Pending,
            TxStatus::Completed,
            TxStatus::Failed,
            TxStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<TxStatus>().ok(), Some(status));
        }
    }

    #[test]
    fn method_tags_round_trip() {
        for method in [
            PaymentMethod::Bank,
            PaymentMethod::MobileMoney,
            PaymentMethod::Crypto,
            PaymentMethod::Manual,
        ] {
            assert_eq!(method.as_str().parse::<PaymentMethod>().ok(), Some(method));
        }
    }

    #[test]
    fn serde_uses_snake_case_tags() {
        let json = serde_json::to_string(&TxKind::ReferralCredit).ok();
        assert_eq!(json, Some("\"referral_credit\"".to_owned()));
        let json = serde_json::to_string(&TxStatus::Pending).ok();
        assert_eq!(json, Some("\"pending\"".to_owned()));
    }
}
