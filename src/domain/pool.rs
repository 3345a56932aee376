//! Prize-pool periods, contributions, and wins.
//!
//! The pool accumulates a configured skim of every settled wager under a
//! period key and pays the whole accumulation to one uniformly chosen
//! contributor when the period is drawn. A period is drawn at most once.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Amount};

/// Key identifying one prize-pool accumulation window.
///
/// The production window is daily: `daily_YYYYMMDD` in UTC. The key is
/// otherwise opaque; draws and contributions only ever compare it for
/// equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey(String);

impl PeriodKey {
    /// Returns the daily window key containing `at`.
    #[must_use]
    pub fn daily(at: DateTime<Utc>) -> Self {
        Self(at.format("daily_%Y%m%d").to_string())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PeriodKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for PeriodKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

/// One recorded contribution toward a period's pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    /// Contributing account.
    pub account_id: AccountId,
    /// Skim amount added to the pool.
    pub amount: Amount,
    /// Contribution timestamp.
    pub created_at: DateTime<Utc>,
}

/// Record of a period's one-time payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolWin {
    /// Drawn period.
    pub period: PeriodKey,
    /// Winning account.
    pub account_id: AccountId,
    /// Full pool total paid out.
    pub amount: Amount,
    /// Count of distinct contributing accounts at draw time.
    pub participants: i64,
    /// Draw timestamp.
    pub won_at: DateTime<Utc>,
}

/// Read-only snapshot of a period's pool for display surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Period the snapshot describes.
    pub period: PeriodKey,
    /// Running contribution total.
    pub total: Amount,
    /// Count of distinct contributing accounts so far.
    pub contributors: i64,
    /// Minimum total required before a draw pays out.
    pub threshold: Amount,
    /// Whether the period has already been drawn.
    pub closed: bool,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn daily_key_formats_utc_date() {
        let Some(at) = Utc.with_ymd_and_hms(2026, 8, 23, 21, 59, 0).single() else {
            panic!("valid timestamp");
        };
        assert_eq!(PeriodKey::daily(at).as_str(), "daily_20260823");
    }

    #[test]
    fn same_day_shares_one_key() {
        let Some(morning) = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 1).single() else {
            panic!("valid timestamp");
        };
        let Some(night) = Utc.with_ymd_and_hms(2026, 1, 5, 23, 59, 59).single() else {
            panic!("valid timestamp");
        };
        assert_eq!(PeriodKey::daily(morning), PeriodKey::daily(night));
        let Some(next) = Utc.with_ymd_and_hms(2026, 1, 6, 0, 0, 0).single() else {
            panic!("valid timestamp");
        };
        assert_ne!(PeriodKey::daily(morning), PeriodKey::daily(next));
    }

    #[test]
    fn period_key_serializes_transparently() {
        let key = PeriodKey::from("daily_20260823");
        assert_eq!(
            serde_json::to_string(&key).ok(),
            Some("\"daily_20260823\"".to_owned())
        );
    }
}
