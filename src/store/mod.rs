//! Persistence layer: SQLite accounts, ledger, promo codes, prize pool.
//!
//! All SQL lives behind [`WalletStore`]; nothing outside this module talks
//! to the database. Store methods take an explicit executor so the same
//! primitive runs against the shared pool for plain reads or against an
//! open [`StoreTx`] when it participates in an atomic unit. A [`StoreTx`]
//! rolls back on drop unless committed, which keeps every non-commit exit
//! path clean of partial effects.

pub mod models;

mod accounts;
mod ledger;
mod pool;
mod promo;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::WalletResult;

/// One atomic unit in progress: a SQLite transaction handle.
///
/// Commit explicitly; dropping the handle rolls the unit back.
pub type StoreTx = sqlx::Transaction<'static, sqlx::Sqlite>;

/// Embedded schema migrations.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed wallet store.
#[derive(Debug, Clone)]
pub struct WalletStore {
    pool: SqlitePool,
}

impl WalletStore {
    /// Opens (creating if missing) a database at `url` and runs migrations.
    ///
    /// File databases use WAL journaling. `max_connections` defaults to 1 in
    /// configuration because SQLite serializes writers anyway; raise it only
    /// for read-heavy file-backed deployments.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Persistence`](crate::error::WalletError::Persistence)
    /// when the URL is malformed or the database cannot be opened, and
    /// [`WalletError::Migration`](crate::error::WalletError::Migration) when
    /// migrations fail.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> WalletResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Opens a fresh private in-memory database and runs migrations.
    ///
    /// The pool is capped at one connection: every extra SQLite connection
    /// to `:memory:` would open its own empty database.
    ///
    /// # Errors
    ///
    /// Returns a persistence or migration error as [`Self::connect`] does.
    pub async fn in_memory() -> WalletResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Migration`](crate::error::WalletError::Migration)
    /// when a migration cannot be applied.
    pub async fn migrate(&self) -> WalletResult<()> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    /// Begins an atomic unit.
    ///
    /// While a unit is open it owns its pooled connection; run every query
    /// of the unit through the returned handle, never through the pool, or
    /// a single-connection deployment will deadlock against itself.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when no connection can be acquired.
    pub async fn begin(&self) -> WalletResult<StoreTx> {
        Ok(self.pool.begin().await?)
    }

    /// Returns the underlying connection pool, for plain reads.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Whether `err` is a uniqueness-constraint rejection.
///
/// Used to translate raced inserts (promo redemption, referral code, code
/// creation) into their domain errors.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
        }
        _ => false,
    }
}
