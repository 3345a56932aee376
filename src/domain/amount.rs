//! Fixed-point money.
//!
//! [`Amount`] holds a currency value as a signed count of minor units (two
//! decimal places). All arithmetic is checked; percentage and basis-point
//! scaling go through 128-bit intermediates and truncate toward zero, so a
//! referral cut or a pool skim can never round a balance upward.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of minor units in one major unit.
const MINOR_PER_MAJOR: i64 = 100;

/// A fixed-point currency amount in minor units.
///
/// Ledger entries store the signed delta they apply (debits negative);
/// account balances are non-negative by invariant. Serialized as the raw
/// minor-unit integer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from a raw count of minor units.
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Creates an amount from whole major units, or `None` on overflow.
    #[must_use]
    pub const fn from_major(major: i64) -> Option<Self> {
        match major.checked_mul(MINOR_PER_MAJOR) {
            Some(minor) => Some(Self(minor)),
            None => None,
        }
    }

    /// Returns the raw count of minor units.
    #[must_use]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns `true` for amounts strictly greater than zero.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns `true` for amounts strictly less than zero.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns `true` for the zero amount.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns the magnitude of this amount, saturating at `i64::MAX`.
    #[must_use]
    pub const fn abs(&self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// Returns the negated amount, or `None` for the unrepresentable edge.
    #[must_use]
    pub const fn checked_neg(&self) -> Option<Self> {
        match self.0.checked_neg() {
            Some(minor) => Some(Self(minor)),
            None => None,
        }
    }

    /// Checked addition.
    #[must_use]
    pub const fn checked_add(&self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(minor) => Some(Self(minor)),
            None => None,
        }
    }

    /// Checked subtraction.
    #[must_use]
    pub const fn checked_sub(&self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(minor) => Some(Self(minor)),
            None => None,
        }
    }

    /// Returns `amount * percent / 100`, truncated toward zero.
    ///
    /// Used for the referral cascade: a 1000.00 deposit at 10 percent yields
    /// exactly 100.00.
    #[must_use]
    pub fn percent(&self, percent: u32) -> Option<Self> {
        let scaled = i128::from(self.0) * i128::from(percent) / 100;
        i64::try_from(scaled).ok().map(Self)
    }

    /// Returns `amount * bps / 10_000`, truncated toward zero.
    ///
    /// Used for the prize-pool skim; 100 bps is one percent.
    #[must_use]
    pub fn basis_points(&self, bps: u32) -> Option<Self> {
        let scaled = i128::from(self.0) * i128::from(bps) / 10_000;
        i64::try_from(scaled).ok().map(Self)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let major = magnitude / 100;
        let cents = magnitude % 100;
        write!(f, "{sign}{major}.{cents:02}")
    }
}

/// Error produced when parsing a textual amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseAmountError {
    /// The input was empty or contained non-numeric characters.
    #[error("not a valid amount: {0:?}")]
    Malformed(String),
    /// More than two decimal places were supplied.
    #[error("amounts carry at most two decimal places: {0:?}")]
    TooPrecise(String),
    /// The value does not fit the representable range.
    #[error("amount out of range: {0:?}")]
    OutOfRange(String),
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    /// Parses `"123"`, `"123.4"`, or `"123.45"`, with an optional leading
    /// minus sign.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let malformed = || ParseAmountError::Malformed(s.to_owned());
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        if unsigned.is_empty() {
            return Err(malformed());
        }
        let (major_text, cents) = match unsigned.split_once('.') {
            None => (unsigned, 0),
            Some((major_text, fraction)) => {
                if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(malformed());
                }
                if fraction.len() > 2 {
                    return Err(ParseAmountError::TooPrecise(s.to_owned()));
                }
                let parsed: i64 = fraction.parse().map_err(|_| malformed())?;
                let cents = if fraction.len() == 1 { parsed * 10 } else { parsed };
                (major_text, cents)
            }
        };
        if major_text.is_empty() || !major_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let major: i64 = major_text
            .parse()
            .map_err(|_| ParseAmountError::OutOfRange(s.to_owned()))?;
        let minor = major
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|m| m.checked_add(cents))
            .ok_or_else(|| ParseAmountError::OutOfRange(s.to_owned()))?;
        Ok(Self(if negative { -minor } else { minor }))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn display_pads_cents() {
        assert_eq!(Amount::from_minor(5000).to_string(), "50.00");
        assert_eq!(Amount::from_minor(12345).to_string(), "123.45");
        assert_eq!(Amount::from_minor(7).to_string(), "0.07");
        assert_eq!(Amount::from_minor(-15000).to_string(), "-150.00");
    }

    #[test]
    fn parses_whole_and_fractional_forms() {
        assert_eq!("100".parse::<Amount>().ok(), Some(Amount::from_minor(10_000)));
        assert_eq!("100.5".parse::<Amount>().ok(), Some(Amount::from_minor(10_050)));
        assert_eq!("100.50".parse::<Amount>().ok(), Some(Amount::from_minor(10_050)));
        assert_eq!(" 20.00 ".parse::<Amount>().ok(), Some(Amount::from_minor(2_000)));
        assert_eq!("-3.25".parse::<Amount>().ok(), Some(Amount::from_minor(-325)));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!("".parse::<Amount>().is_err());
        assert!("abc".parse::<Amount>().is_err());
        assert!("1.2.3".parse::<Amount>().is_err());
        assert!("10.".parse::<Amount>().is_err());
        assert!("1,000".parse::<Amount>().is_err());
        assert_eq!(
            "1.234".parse::<Amount>(),
            Err(ParseAmountError::TooPrecise("1.234".to_owned()))
        );
    }

    #[test]
    fn percent_truncates_toward_zero() {
        let deposit = Amount::from_minor(100_000); // 1000.00
        assert_eq!(deposit.percent(10), Some(Amount::from_minor(10_000)));
        let odd = Amount::from_minor(3_333); // 33.33
        assert_eq!(odd.percent(10), Some(Amount::from_minor(333)));
    }

    #[test]
    fn basis_points_matches_one_percent() {
        let wager = Amount::from_minor(50_000); // 500.00
        assert_eq!(wager.basis_points(100), Some(Amount::from_minor(500)));
        let tiny = Amount::from_minor(50); // 0.50 at 1% rounds to zero
        assert_eq!(tiny.basis_points(100), Some(Amount::ZERO));
    }

    #[test]
    fn checked_math_covers_overflow() {
        let max = Amount::from_minor(i64::MAX);
        assert_eq!(max.checked_add(Amount::from_minor(1)), None);
        assert_eq!(Amount::from_major(i64::MAX), None);
        let Some(sum) = Amount::from_minor(150).checked_add(Amount::from_minor(50)) else {
            panic!("small sum must not overflow");
        };
        assert_eq!(sum, Amount::from_minor(200));
    }
}
