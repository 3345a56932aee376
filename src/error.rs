//! Wallet error types.
//!
//! [`WalletError`] is the central error type for the crate. Every variant
//! other than [`WalletError::Persistence`] and [`WalletError::Internal`]
//! reports a request the caller got wrong; none of them leave partial state
//! behind, since an operation either commits whole or not at all. Notification
//! delivery failures are deliberately not represented here: they are caught
//! and logged at the publish site and never propagate to callers.

use crate::domain::amount::ParseAmountError;
use crate::domain::promo::CodeFormatError;
use crate::domain::transaction::TagParseError;
use crate::domain::{Amount, TxId, TxStatus};

/// Convenience alias for fallible wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;

/// Central error enum for all wallet operations.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// Malformed or out-of-bound input; nothing was changed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A debit would have taken the balance negative; nothing was changed.
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Balance observed when the debit was refused.
        balance: Amount,
        /// Magnitude of the refused debit.
        requested: Amount,
    },

    /// No account matches the given reference.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// No ledger entry matches the given id.
    #[error("transaction not found: {0}")]
    TransactionNotFound(TxId),

    /// No live promo code matches the given string.
    #[error("promo code not found: {0}")]
    CodeNotFound(String),

    /// The entry already reached a terminal status.
    #[error("transaction {id} is already {status}")]
    InvalidStateTransition {
        /// Entry the transition was attempted on.
        id: TxId,
        /// Status that blocked the transition.
        status: TxStatus,
    },

    /// Every redemption slot of the code is consumed.
    #[error("promo code exhausted: {0}")]
    CodeExhausted(String),

    /// The account already redeemed this code once.
    #[error("promo code already redeemed by this account: {0}")]
    CodeAlreadyUsed(String),

    /// A code with the same normalized form already exists.
    #[error("promo code already exists: {0}")]
    CodeExists(String),

    /// The acting id is not on the admin allowlist.
    #[error("not authorized for admin operations: {0}")]
    Unauthorized(String),

    /// The store rejected or lost the operation; nothing was committed.
    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Schema migration failure at startup.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Invariant breach or unrepresentable computation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WalletError {
    /// Shorthand for a [`WalletError::Validation`] with a formatted message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the error reports a fault in the request rather than in the
    /// wallet or its store. User-fault errors are safe to surface verbatim
    /// to the requesting account.
    #[must_use]
    pub const fn is_user_fault(&self) -> bool {
        !matches!(
            self,
            Self::Persistence(_) | Self::Migration(_) | Self::Internal(_)
        )
    }
}

impl From<ParseAmountError> for WalletError {
    fn from(err: ParseAmountError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<CodeFormatError> for WalletError {
    fn from(err: CodeFormatError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<TagParseError> for WalletError {
    fn from(err: TagParseError) -> Self {
        // A bad tag can only come out of the store; treat as corruption, not
        // caller fault.
        Self::Internal(err.to_string())
    }
}
