//! Conversational input state.
//!
//! The front end walks users through multi-step flows (type an amount, name a
//! recipient, paste a code). [`SessionRegistry`] tracks where each account
//! stands in such a flow as one tagged [`SessionState`] value keyed by
//! account id; a cancel from any state clears back to [`SessionState::Idle`].
//! Session state is in-memory only and carries no financial effect.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::transaction::PaymentMethod;
use super::{AccountId, Amount, ExternalId};

/// Where an account stands in a conversational flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No flow in progress.
    #[default]
    Idle,
    /// Waiting for a deposit amount for the chosen method.
    AwaitingDepositAmount {
        /// Method picked before the amount prompt.
        method: PaymentMethod,
    },
    /// Waiting for a withdrawal amount for the chosen method.
    AwaitingWithdrawAmount {
        /// Method picked before the amount prompt.
        method: PaymentMethod,
    },
    /// Waiting for the recipient of a gift.
    AwaitingGiftRecipient,
    /// Waiting for the amount of a gift to a known recipient.
    AwaitingGiftAmount {
        /// Recipient resolved in the previous step.
        recipient: ExternalId,
        /// Gift size parsed so far, when the flow collects it first.
        amount: Option<Amount>,
    },
    /// Waiting for a promo code to redeem.
    AwaitingPromoCode,
    /// Waiting for a free-text support message.
    AwaitingSupportMessage,
}

impl SessionState {
    /// Whether no flow is in progress.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Per-account conversational state, keyed by account id.
///
/// Absent keys read as [`SessionState::Idle`]; storing `Idle` removes the
/// key, so the map only ever holds accounts mid-flow.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<AccountId, SessionState>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the account's current state, `Idle` when none is stored.
    pub async fn current(&self, account_id: AccountId) -> SessionState {
        self.sessions
            .read()
            .await
            .get(&account_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Moves the account to `state`, returning the state it replaced.
    pub async fn set(&self, account_id: AccountId, state: SessionState) -> SessionState {
        let mut map = self.sessions.write().await;
        let previous = if state.is_idle() {
            map.remove(&account_id)
        } else {
            map.insert(account_id, state)
        };
        previous.unwrap_or_default()
    }

    /// Cancel transition: clears the account back to `Idle`.
    ///
    /// Returns `true` when a flow was actually in progress.
    pub async fn clear(&self, account_id: AccountId) -> bool {
        self.sessions.write().await.remove(&account_id).is_some()
    }

    /// Number of accounts currently mid-flow.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` when no account is mid-flow.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_accounts_read_idle() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.current(AccountId::new()).await, SessionState::Idle);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn set_and_read_back() {
        let registry = SessionRegistry::new();
        let id = AccountId::new();
        let previous = registry
            .set(
                id,
                SessionState::AwaitingDepositAmount {
                    method: PaymentMethod::Bank,
                },
            )
            .await;
        assert_eq!(previous, SessionState::Idle);
        assert_eq!(
            registry.current(id).await,
            SessionState::AwaitingDepositAmount {
                method: PaymentMethod::Bank
            }
        );
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn clear_returns_to_idle_from_any_state() {
        let registry = SessionRegistry::new();
        let id = AccountId::new();
        let _ = registry.set(id, SessionState::AwaitingPromoCode).await;
        assert!(registry.clear(id).await);
        assert_eq!(registry.current(id).await, SessionState::Idle);
        // Clearing an idle account is a no-op.
        assert!(!registry.clear(id).await);
    }

    #[tokio::test]
    async fn storing_idle_removes_the_key() {
        let registry = SessionRegistry::new();
        let id = AccountId::new();
        let _ = registry.set(id, SessionState::AwaitingGiftRecipient).await;
        let previous = registry.set(id, SessionState::Idle).await;
        assert_eq!(previous, SessionState::AwaitingGiftRecipient);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn flows_advance_through_states() {
        let registry = SessionRegistry::new();
        let id = AccountId::new();
        let _ = registry.set(id, SessionState::AwaitingGiftRecipient).await;
        let recipient = ExternalId::new("884213");
        let _ = registry
            .set(
                id,
                SessionState::AwaitingGiftAmount {
                    recipient: recipient.clone(),
                    amount: None,
                },
            )
            .await;
        let SessionState::AwaitingGiftAmount { recipient: stored, .. } =
            registry.current(id).await
        else {
            panic!("expected gift-amount state");
        };
        assert_eq!(stored, recipient);
    }
}
