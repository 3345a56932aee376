//! Type-safe identifiers for accounts and ledger entries.
//!
//! [`AccountId`] is a newtype wrapper around [`uuid::Uuid`] (v4) providing
//! type safety so that account identifiers cannot be confused with other
//! UUIDs. [`ExternalId`] carries the opaque reference the chat platform uses
//! for an account; [`TxId`] is the monotonic ledger row id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique internal identifier for a wallet account.
///
/// Wraps a UUID v4. Generated once at account creation time and immutable
/// thereafter. Used as the key in the [`super::SessionRegistry`] and as the
/// owning-account column of every ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(uuid::Uuid);

impl AccountId {
    /// Creates a new random `AccountId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates an `AccountId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for AccountId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<AccountId> for uuid::Uuid {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// Opaque account reference on the chat platform.
///
/// This is the identity the excluded front end hands in on first contact and
/// the address the notification bus publishes to. The wallet treats it as an
/// opaque, stable string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Wraps a platform account reference.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExternalId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl From<String> for ExternalId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Ledger row identifier.
///
/// Assigned by the store as a monotonically increasing integer; this is the
/// id admins quote when approving or rejecting a payment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(i64);

impl TxId {
    /// Wraps a raw ledger row id.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw row id.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TxId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl From<TxId> for i64 {
    fn from(id: TxId) -> Self {
        id.0
    }
}
