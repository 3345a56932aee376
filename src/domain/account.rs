//! Wallet accounts and the wagering tier ladder.
//!
//! An [`Account`] is created on first contact and never deleted. Balance is
//! non-negative after every committed operation; referral metadata links
//! accounts through referral codes rather than direct ids so a code can be
//! shared out-of-band before the referred account exists.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::transaction::TagParseError;
use super::{AccountId, Amount, ExternalId};

/// Wagering tier, recomputed from the cumulative wagered total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Below 5 000 wagered.
    Beginner,
    /// 5 000 wagered.
    Bronze,
    /// 20 000 wagered.
    Silver,
    /// 50 000 wagered.
    Gold,
    /// 100 000 wagered.
    Diamond,
}

impl Tier {
    /// Ladder thresholds in minor units, ascending.
    const LADDER: [(Self, i64); 5] = [
        (Self::Beginner, 0),
        (Self::Bronze, 500_000),
        (Self::Silver, 2_000_000),
        (Self::Gold, 5_000_000),
        (Self::Diamond, 10_000_000),
    ];

    /// Returns the tier earned by a cumulative wagered total.
    #[must_use]
    pub fn for_wagered(total_wagered: Amount) -> Self {
        let mut earned = Self::Beginner;
        for (tier, threshold) in Self::LADDER {
            if total_wagered.minor() >= threshold {
                earned = tier;
            }
        }
        earned
    }

    /// Returns the stored tag string for this tier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Diamond => "diamond",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Self::Beginner),
            "bronze" => Ok(Self::Bronze),
            "silver" => Ok(Self::Silver),
            "gold" => Ok(Self::Gold),
            "diamond" => Ok(Self::Diamond),
            other => Err(TagParseError {
                what: "tier",
                value: other.to_owned(),
            }),
        }
    }
}

/// Profile details supplied by the front end on first contact.
///
/// Everything is optional: an account created from a bare first contact has
/// no display name and no referral linkage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedProfile {
    /// Human-readable name for notices and admin listings.
    pub display_name: Option<String>,
    /// Referral code the new account arrived through, if any.
    pub referred_by_code: Option<String>,
}

/// One wallet account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Internal account id.
    pub id: AccountId,
    /// Stable chat-platform reference.
    pub external_id: ExternalId,
    /// Display name, if the platform supplied one.
    pub display_name: Option<String>,
    /// Current balance; never negative after a committed operation.
    pub balance: Amount,
    /// This account's own shareable referral code.
    pub referral_code: String,
    /// Referral code this account arrived through, if any.
    pub referred_by: Option<String>,
    /// Number of accounts that arrived through this account's code.
    pub referral_count: i64,
    /// Lifetime referral cascade earnings.
    pub referral_earnings: Amount,
    /// Lifetime wagered total (stakes settled through the wallet).
    pub total_wagered: Amount,
    /// Lifetime wager payout total.
    pub total_won: Amount,
    /// Current tier on the wagering ladder.
    pub tier: Tier,
    /// Banned accounts are refused new money operations.
    pub banned: bool,
    /// First-contact timestamp.
    pub created_at: DateTime<Utc>,
    /// Last operation timestamp.
    pub last_active_at: DateTime<Utc>,
}

impl Account {
    /// Name to address this account by in notices: the display name when one
    /// exists, otherwise the platform reference.
    #[must_use]
    pub fn display_label(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.external_id.to_string())
    }
}
