//! Admin authorization capability.
//!
//! [`AdminGate`] holds the allowlist of account references permitted to call
//! administrative operations. Services receive the gate at construction and
//! check the acting reference on every admin entry point.

use std::collections::HashSet;

use crate::domain::ExternalId;
use crate::error::{WalletError, WalletResult};

/// Allowlist capability for administrative operations.
#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    admins: HashSet<ExternalId>,
}

impl AdminGate {
    /// Builds a gate from the allowlisted references.
    #[must_use]
    pub fn new(admins: impl IntoIterator<Item = ExternalId>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    /// Whether `actor` is on the allowlist.
    #[must_use]
    pub fn is_admin(&self, actor: &ExternalId) -> bool {
        self.admins.contains(actor)
    }

    /// Authorizes `actor` for an admin operation.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Unauthorized`] when `actor` is not
    /// allowlisted.
    pub fn ensure(&self, actor: &ExternalId) -> WalletResult<()> {
        if self.is_admin(actor) {
            Ok(())
        } else {
            Err(WalletError::Unauthorized(actor.to_string()))
        }
    }

    /// Iterates the allowlisted references, for admin notice fan-out.
    pub fn roster(&self) -> impl Iterator<Item = &ExternalId> {
        self.admins.iter()
    }

    /// Number of allowlisted references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.admins.len()
    }

    /// Returns `true` when nobody is allowlisted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}
