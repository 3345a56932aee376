//! Promotional codes.
//!
//! A [`PromoCode`] grants a fixed credit to at most `max_uses` distinct
//! accounts, at most once per account. Codes are matched case-insensitively:
//! the stored form is the normalized one (trimmed, uppercased), so lookups
//! normalize before comparing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Amount;

/// Shortest accepted code, normalized length.
const MIN_CODE_LEN: usize = 4;
/// Longest accepted code, normalized length.
const MAX_CODE_LEN: usize = 20;

/// Error produced when a promo code fails format validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodeFormatError {
    /// Normalized code is shorter than 4 or longer than 20 characters.
    #[error("promo codes are {MIN_CODE_LEN}-{MAX_CODE_LEN} characters long")]
    Length,
    /// Normalized code contains characters outside `A-Z0-9`.
    #[error("promo codes use letters and digits only")]
    Charset,
}

/// Normalizes a user-typed code: trims surrounding whitespace and upcases.
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Normalizes and validates a code's shape.
///
/// # Errors
///
/// Returns [`CodeFormatError`] when the normalized form is out of bounds or
/// uses characters outside `A-Z0-9`.
pub fn validate_code(raw: &str) -> Result<String, CodeFormatError> {
    let code = normalize_code(raw);
    if code.len() < MIN_CODE_LEN || code.len() > MAX_CODE_LEN {
        return Err(CodeFormatError::Length);
    }
    if !code.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
        return Err(CodeFormatError::Charset);
    }
    Ok(code)
}

/// One promotional code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoCode {
    /// Store row id.
    pub id: i64,
    /// Normalized code string, unique case-insensitively.
    pub code: String,
    /// Credit granted per redemption.
    pub amount: Amount,
    /// Total redemptions allowed across all accounts.
    pub max_uses: i64,
    /// Redemptions consumed so far; never exceeds `max_uses`.
    pub uses: i64,
    /// Inactive codes behave as nonexistent.
    pub active: bool,
    /// Optional expiry; expired codes behave as nonexistent.
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    /// Whether every redemption slot has been consumed.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.uses >= self.max_uses
    }

    /// Whether the code is redeemable at `now`: active and not expired.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.is_none_or(|expiry| expiry > now)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn normalization_trims_and_upcases() {
        assert_eq!(normalize_code("  welcome50 "), "WELCOME50");
        assert_eq!(normalize_code("Bonus"), "BONUS");
    }

    #[test]
    fn validation_enforces_shape() {
        assert_eq!(validate_code("welcome50").ok().as_deref(), Some("WELCOME50"));
        assert_eq!(validate_code("abc"), Err(CodeFormatError::Length));
        assert_eq!(
            validate_code("ABCDEFGHIJKLMNOPQRSTU"),
            Err(CodeFormatError::Length)
        );
        assert_eq!(validate_code("WITH SPACE"), Err(CodeFormatError::Charset));
        assert_eq!(validate_code("naïve"), Err(CodeFormatError::Charset));
    }

    fn sample(uses: i64, max_uses: i64) -> PromoCode {
        PromoCode {
            id: 1,
            code: "WELCOME50".to_owned(),
            amount: Amount::from_minor(5_000),
            max_uses,
            uses,
            active: true,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn exhaustion_is_a_pure_count_check() {
        assert!(!sample(0, 1).is_exhausted());
        assert!(sample(1, 1).is_exhausted());
        assert!(sample(5, 5).is_exhausted());
    }

    #[test]
    fn liveness_honors_active_flag_and_expiry() {
        let now = Utc::now();
        let mut code = sample(0, 1);
        assert!(code.is_live(now));
        code.active = false;
        assert!(!code.is_live(now));
        code.active = true;
        code.expires_at = Some(now - Duration::hours(1));
        assert!(!code.is_live(now));
        code.expires_at = Some(now + Duration::hours(1));
        assert!(code.is_live(now));
    }
}
