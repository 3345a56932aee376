//! Service layer: business logic orchestration.
//!
//! One service per workflow, all stateless coordinators over
//! [`WalletStore`] and the [`NotificationBus`](crate::notify::NotificationBus).
//! Mutation methods follow the same pattern: validate input → open a store
//! unit → apply guarded writes → commit → notify best-effort.

pub mod accounts;
pub mod gifts;
pub mod ledger;
pub mod payments;
pub mod pool;
pub mod promo;
pub mod referrals;
pub mod wagers;

pub use accounts::{AccountService, BroadcastReport};
pub use gifts::{GiftPair, GiftService};
pub use ledger::LedgerService;
pub use payments::PaymentService;
pub use pool::PoolService;
pub use promo::PromoService;
pub use referrals::{ReferralPayout, ReferralService};
pub use wagers::WagerService;

use crate::domain::{Account, ExternalId};
use crate::error::{WalletError, WalletResult};
use crate::store::WalletStore;

/// Fetches the account behind an external reference, refusing banned ones.
///
/// Every user-initiated workflow funnels through this check before touching
/// balances.
pub(crate) async fn active_account(
    store: &WalletStore,
    external_id: &ExternalId,
) -> WalletResult<Account> {
    let Some(row) = store.account_by_external(store.pool(), external_id).await? else {
        return Err(WalletError::AccountNotFound(external_id.to_string()));
    };
    let account = Account::try_from(row)?;
    if account.banned {
        return Err(WalletError::validation("account is banned"));
    }
    Ok(account)
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod testkit {
    //! Shared fixtures for the service test modules.

    use chrono::Utc;

    use crate::auth::AdminGate;
    use crate::domain::{short_token, Account, AccountId, Amount, ExternalId, Tier};
    use crate::store::WalletStore;

    /// External id on the operator allowlist of [`ops_gate`].
    pub const OPERATOR: &str = "ops-1";

    /// Opens a migrated in-memory store.
    pub async fn mem_store() -> WalletStore {
        let Ok(store) = WalletStore::in_memory().await else {
            panic!("in-memory store should open");
        };
        store
    }

    /// Gate whose only operator is [`OPERATOR`].
    pub fn ops_gate() -> AdminGate {
        AdminGate::new([ExternalId::from(OPERATOR)])
    }

    /// Inserts an account with the given starting balance.
    pub async fn seed(store: &WalletStore, external: &str, balance: Amount) -> Account {
        let now = Utc::now();
        let account = Account {
            id: AccountId::new(),
            external_id: ExternalId::from(external),
            display_name: None,
            balance,
            referral_code: short_token(),
            referred_by: None,
            referral_count: 0,
            referral_earnings: Amount::ZERO,
            total_wagered: Amount::ZERO,
            total_won: Amount::ZERO,
            tier: Tier::Beginner,
            banned: false,
            created_at: now,
            last_active_at: now,
        };
        let Ok(()) = store.insert_account(store.pool(), &account).await else {
            panic!("seed account should insert");
        };
        account
    }

    /// Current balance of an account, read straight from the store.
    pub async fn balance_of(store: &WalletStore, id: AccountId) -> i64 {
        let Ok(Some(row)) = store.account_by_id(store.pool(), id).await else {
            panic!("seeded account should exist");
        };
        row.balance
    }
}
