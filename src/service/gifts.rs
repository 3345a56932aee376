//! Peer-to-peer gifts: one unit moves the amount between two accounts.
//!
//! The outgoing debit lands first, so a shortfall aborts before the
//! recipient's credit exists. Both halves settle immediately and show up in
//! both histories.

use chrono::Utc;

use crate::domain::{Amount, ExternalId, Transaction, TxKind, TxStatus};
use crate::error::{WalletError, WalletResult};
use crate::notify::NotificationBus;
use crate::service::active_account;
use crate::service::ledger::record_in_unit;
use crate::store::models::NewTransaction;
use crate::store::WalletStore;

/// The two ledger entries a completed gift leaves behind.
#[derive(Debug, Clone)]
pub struct GiftPair {
    /// The sender's debit entry.
    pub sent: Transaction,
    /// The recipient's credit entry.
    pub received: Transaction,
}

/// Moves balance between accounts as paired gift entries.
#[derive(Debug, Clone)]
pub struct GiftService {
    store: WalletStore,
    notifier: NotificationBus,
    gift_min: Amount,
}

impl GiftService {
    /// Creates a new `GiftService` refusing gifts under `gift_min`.
    #[must_use]
    pub fn new(store: WalletStore, notifier: NotificationBus, gift_min: Amount) -> Self {
        Self {
            store,
            notifier,
            gift_min,
        }
    }

    /// Sends `amount` from one account to another.
    ///
    /// # Errors
    ///
    /// [`WalletError::Validation`] for a gift under the minimum, a
    /// self-gift, or a banned party; [`WalletError::InsufficientFunds`]
    /// when the sender cannot cover it; [`WalletError::AccountNotFound`]
    /// for an unknown party.
    pub async fn send(
        &self,
        sender_id: &ExternalId,
        recipient_id: &ExternalId,
        amount: Amount,
    ) -> WalletResult<GiftPair> {
        if amount < self.gift_min {
            return Err(WalletError::validation(format!(
                "gifts start at {}",
                self.gift_min
            )));
        }
        if sender_id == recipient_id {
            return Err(WalletError::validation("cannot gift your own account"));
        }
        let sender = active_account(&self.store, sender_id).await?;
        let recipient = active_account(&self.store, recipient_id).await?;
        let Some(debit) = amount.checked_neg() else {
            return Err(WalletError::Internal("gift amount overflow".to_owned()));
        };
        let now = Utc::now();

        let mut unit = self.store.begin().await?;
        let sent = record_in_unit(
            &self.store,
            &mut unit,
            NewTransaction {
                account_id: sender.id,
                kind: TxKind::GiftSent,
                amount: debit,
                status: TxStatus::Completed,
                method: None,
                note: format!("gift to {}", recipient.display_label()),
                reference: None,
                created_at: now,
                processed_at: Some(now),
            },
        )
        .await?;
        let received = record_in_unit(
            &self.store,
            &mut unit,
            NewTransaction {
                account_id: recipient.id,
                kind: TxKind::GiftReceived,
                amount,
                status: TxStatus::Completed,
                method: None,
                note: format!("gift from {}", sender.display_label()),
                reference: None,
                created_at: now,
                processed_at: Some(now),
            },
        )
        .await?;
        unit.commit().await?;
        tracing::info!(
            sender = %sender.id,
            recipient = %recipient.id,
            %amount,
            "gift delivered"
        );
        self.notifier.notify(
            recipient_id,
            format!("You received {amount} from {}.", sender.display_label()),
        );
        self.notifier.notify(
            sender_id,
            format!("Gift of {amount} sent to {}.", recipient.display_label()),
        );
        Ok(GiftPair {
            sent: sent.transaction,
            received: received.transaction,
        })
    }
}
