//! Wallet configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`), with product defaults baked into
//! [`WalletConfig::default`]. Amount-valued settings are written in major
//! units (`"10"` or `"10.50"`).

use crate::domain::{Amount, ExternalId, PaymentMethod};

/// Validation bounds for one payment direction pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentLimits {
    /// Smallest accepted deposit request.
    pub deposit_min: Amount,
    /// Largest accepted deposit request.
    pub deposit_max: Amount,
    /// Smallest accepted withdrawal request.
    pub withdraw_min: Amount,
    /// Largest accepted withdrawal request (further capped by balance).
    pub withdraw_max: Amount,
}

impl Default for PaymentLimits {
    fn default() -> Self {
        Self {
            deposit_min: Amount::from_minor(1_000),
            deposit_max: Amount::from_minor(1_000_000),
            withdraw_min: Amount::from_minor(2_000),
            withdraw_max: Amount::from_minor(500_000),
        }
    }
}

/// Per-method payment limits.
///
/// Every method starts from the shared defaults; individual bounds can be
/// overridden per method (`BANK_DEPOSIT_MIN`, `CRYPTO_WITHDRAW_MAX`, ...).
/// `manual` is an admin-only tag and carries no limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MethodLimits {
    /// Bounds for bank transfers.
    pub bank: PaymentLimits,
    /// Bounds for mobile-money wallets.
    pub mobile_money: PaymentLimits,
    /// Bounds for cryptocurrency transfers.
    pub crypto: PaymentLimits,
}

impl MethodLimits {
    /// Returns the bounds for `method`, or `None` for the admin-only
    /// `manual` tag.
    #[must_use]
    pub const fn for_method(&self, method: PaymentMethod) -> Option<&PaymentLimits> {
        match method {
            PaymentMethod::Bank => Some(&self.bank),
            PaymentMethod::MobileMoney => Some(&self.mobile_money),
            PaymentMethod::Crypto => Some(&self.crypto),
            PaymentMethod::Manual => None,
        }
    }
}

/// Top-level wallet configuration.
///
/// Loaded once at startup via [`WalletConfig::from_env`].
#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// SQLite connection string.
    pub database_url: String,

    /// Maximum number of database connections in the pool.
    ///
    /// SQLite allows one writer at a time; the default single connection
    /// serializes units without busy-retry noise. Raise it for read-heavy
    /// file-backed deployments.
    pub database_max_connections: u32,

    /// Timeout in seconds for acquiring a database connection.
    pub database_connect_timeout_secs: u64,

    /// Per-method payment request bounds.
    pub limits: MethodLimits,

    /// Smallest accepted peer gift.
    pub gift_min: Amount,

    /// Referral cascade percentage of a completed deposit.
    pub referral_percent: u32,

    /// Prize-pool skim per settled wager, in basis points.
    pub pool_rate_bps: u32,

    /// Minimum pool total before a draw pays out.
    pub pool_min_total: Amount,

    /// Retention window for terminal ledger entries, in days.
    pub retention_days: u64,

    /// Capacity of the notification broadcast channel.
    pub bus_capacity: usize,

    /// Allowlisted admin account references.
    pub admin_ids: Vec<ExternalId>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://bankroll.db?mode=rwc".to_owned(),
            database_max_connections: 1,
            database_connect_timeout_secs: 5,
            limits: MethodLimits::default(),
            gift_min: Amount::from_minor(500),
            referral_percent: 10,
            pool_rate_bps: 100,
            pool_min_total: Amount::from_minor(100_000),
            retention_days: 30,
            bus_capacity: 10_000,
            admin_ids: Vec::new(),
        }
    }
}

impl WalletConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to the [`Default`] values when a variable is not set or
    /// does not parse. Calls `dotenvy::dotenv().ok()` to optionally load a
    /// `.env` file.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or(defaults.database_url);
        let admin_ids = std::env::var("ADMIN_IDS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(ExternalId::from)
                    .collect()
            })
            .unwrap_or(defaults.admin_ids);

        Self {
            database_url,
            database_max_connections: parse_env(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            database_connect_timeout_secs: parse_env(
                "DATABASE_CONNECT_TIMEOUT_SECS",
                defaults.database_connect_timeout_secs,
            ),
            limits: limits_from_env(),
            gift_min: parse_env("GIFT_MIN", defaults.gift_min),
            referral_percent: parse_env("REFERRAL_PERCENT", defaults.referral_percent),
            pool_rate_bps: parse_env("POOL_RATE_BPS", defaults.pool_rate_bps),
            pool_min_total: parse_env("POOL_MIN_TOTAL", defaults.pool_min_total),
            retention_days: parse_env("RETENTION_DAYS", defaults.retention_days),
            bus_capacity: parse_env("BUS_CAPACITY", defaults.bus_capacity),
            admin_ids,
        }
    }
}

/// Reads the shared payment bounds, then applies per-method overrides.
fn limits_from_env() -> MethodLimits {
    let shared = PaymentLimits {
        deposit_min: parse_env("DEPOSIT_MIN", PaymentLimits::default().deposit_min),
        deposit_max: parse_env("DEPOSIT_MAX", PaymentLimits::default().deposit_max),
        withdraw_min: parse_env("WITHDRAW_MIN", PaymentLimits::default().withdraw_min),
        withdraw_max: parse_env("WITHDRAW_MAX", PaymentLimits::default().withdraw_max),
    };
    MethodLimits {
        bank: method_limits_from_env("BANK", shared),
        mobile_money: method_limits_from_env("MOBILE_MONEY", shared),
        crypto: method_limits_from_env("CRYPTO", shared),
    }
}

/// Reads `{prefix}_DEPOSIT_MIN` and friends, defaulting to `shared`.
fn method_limits_from_env(prefix: &str, shared: PaymentLimits) -> PaymentLimits {
    PaymentLimits {
        deposit_min: parse_env(&format!("{prefix}_DEPOSIT_MIN"), shared.deposit_min),
        deposit_max: parse_env(&format!("{prefix}_DEPOSIT_MAX"), shared.deposit_max),
        withdraw_min: parse_env(&format!("{prefix}_WITHDRAW_MIN"), shared.withdraw_min),
        withdraw_max: parse_env(&format!("{prefix}_WITHDRAW_MAX"), shared.withdraw_max),
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
