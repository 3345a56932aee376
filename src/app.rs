//! Wallet assembly: one constructor wires the store, the notification bus,
//! the admin gate, and every service around a [`WalletConfig`].
//!
//! The front end, the scheduler, and the admin surface all hold one
//! [`Wallet`] and reach their operations through its accessors. Services
//! share the same store and bus, so cloning the wallet is cheap and every
//! clone observes the same state.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::AdminGate;
use crate::config::WalletConfig;
use crate::domain::SessionRegistry;
use crate::error::WalletResult;
use crate::notify::NotificationBus;
use crate::service::{
    AccountService, GiftService, LedgerService, PaymentService, PoolService, PromoService,
    ReferralService, WagerService,
};
use crate::store::WalletStore;

/// Fully wired wallet.
#[derive(Debug, Clone)]
pub struct Wallet {
    store: WalletStore,
    notifier: NotificationBus,
    gate: AdminGate,
    sessions: Arc<SessionRegistry>,
    accounts: AccountService,
    payments: PaymentService,
    promos: PromoService,
    pool: PoolService,
    wagers: WagerService,
    gifts: GiftService,
    ledger: LedgerService,
}

impl Wallet {
    /// Opens the configured database, runs migrations, and wires every
    /// service.
    ///
    /// # Errors
    ///
    /// Returns a persistence or migration error when the database cannot be
    /// opened.
    pub async fn from_config(config: &WalletConfig) -> WalletResult<Self> {
        let store = WalletStore::connect(
            &config.database_url,
            config.database_max_connections,
            Duration::from_secs(config.database_connect_timeout_secs),
        )
        .await?;
        tracing::info!(
            database = %config.database_url,
            admins = config.admin_ids.len(),
            "wallet store opened"
        );
        Ok(Self::assemble(store, config))
    }

    /// Wires every service around an already-open store.
    #[must_use]
    pub fn assemble(store: WalletStore, config: &WalletConfig) -> Self {
        let notifier = NotificationBus::new(config.bus_capacity);
        let gate = AdminGate::new(config.admin_ids.iter().cloned());
        let referrals = ReferralService::new(store.clone(), config.referral_percent);
        let pool = PoolService::new(
            store.clone(),
            notifier.clone(),
            gate.clone(),
            config.pool_rate_bps,
            config.pool_min_total,
        );
        Self {
            accounts: AccountService::new(store.clone(), notifier.clone(), gate.clone()),
            payments: PaymentService::new(
                store.clone(),
                notifier.clone(),
                gate.clone(),
                config.limits,
                referrals,
            ),
            promos: PromoService::new(store.clone(), notifier.clone(), gate.clone()),
            wagers: WagerService::new(store.clone(), notifier.clone(), pool.clone()),
            gifts: GiftService::new(store.clone(), notifier.clone(), config.gift_min),
            ledger: LedgerService::new(store.clone(), notifier.clone(), gate.clone()),
            sessions: Arc::new(SessionRegistry::new()),
            pool,
            gate,
            notifier,
            store,
        }
    }

    /// Account creation, lookup, bans, and broadcast.
    #[must_use]
    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    /// Deposit and withdrawal requests plus their operator review.
    #[must_use]
    pub fn payments(&self) -> &PaymentService {
        &self.payments
    }

    /// Promo code creation and redemption.
    #[must_use]
    pub fn promos(&self) -> &PromoService {
        &self.promos
    }

    /// Prize-pool status and the scheduler-driven draw.
    #[must_use]
    pub fn pool(&self) -> &PoolService {
        &self.pool
    }

    /// Wager settlement reported by the gaming platform.
    #[must_use]
    pub fn wagers(&self) -> &WagerService {
        &self.wagers
    }

    /// Peer-to-peer gifts.
    #[must_use]
    pub fn gifts(&self) -> &GiftService {
        &self.gifts
    }

    /// Direct ledger operations: admin adjustments, history, retention.
    #[must_use]
    pub fn ledger(&self) -> &LedgerService {
        &self.ledger
    }

    /// Conversational input state for the front end.
    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Notification bus the chat transport subscribes to.
    #[must_use]
    pub fn notifier(&self) -> &NotificationBus {
        &self.notifier
    }

    /// Admin allowlist shared by every gated operation.
    #[must_use]
    pub fn gate(&self) -> &AdminGate {
        &self.gate
    }

    /// Underlying store, for embedding deployments that extend the schema.
    #[must_use]
    pub fn store(&self) -> &WalletStore {
        &self.store
    }
}
