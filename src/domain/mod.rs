//! Domain layer: core wallet types.
//!
//! This module contains the account model and tier ladder, fixed-point
//! money, ledger entry types, promo codes, prize-pool periods, and the
//! per-account conversational session registry.

pub mod account;
pub mod amount;
pub mod ids;
pub mod pool;
pub mod promo;
pub mod session;
pub mod transaction;

pub use account::{Account, SeedProfile, Tier};
pub use amount::{Amount, ParseAmountError};
pub use ids::{AccountId, ExternalId, TxId};
pub use pool::{Contribution, PeriodKey, PoolStatus, PoolWin};
pub use promo::{normalize_code, validate_code, CodeFormatError, PromoCode};
pub use session::{SessionRegistry, SessionState};
pub use transaction::{PaymentMethod, Transaction, TxKind, TxStatus};

/// Returns an 8-character uppercase token drawn from a fresh UUID.
///
/// Referral codes and payment references both use this shape; uniqueness is
/// enforced by the store, with generation retried on collision.
#[must_use]
pub fn short_token() -> String {
    let mut token = uuid::Uuid::new_v4().simple().to_string();
    token.truncate(8);
    token.to_uppercase()
}
