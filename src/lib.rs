//! # bankroll
//!
//! Balance ledger and reward-distribution engine for a chat-operated gaming
//! wallet.
//!
//! The crate keeps per-account balances in fixed-point minor units, records
//! every movement as an append-mostly ledger entry, and runs the reward
//! machinery around it: operator-reviewed deposits and withdrawals, a
//! referral cascade on completed deposits, capped promo codes, peer gifts,
//! externally settled wagers with a tier ladder, and a periodic prize pool
//! skimmed from stakes. The chat transport, game platform, scheduler, and
//! admin surface are external collaborators; this crate is the engine they
//! call into.
//!
//! ## Architecture
//!
//! ```text
//! Front end / Admin surface / Scheduler
//!     │
//!     ├── Wallet (app)
//!     │       ├── AccountService ─┐
//!     │       ├── PaymentService ─┤  service/
//!     │       ├── PromoService ───┤
//!     │       ├── PoolService ────┤
//!     │       ├── WagerService ───┤
//!     │       ├── GiftService ────┤
//!     │       └── LedgerService ──┘
//!     │               │
//!     │       WalletStore (store/, SQLite via sqlx)
//!     │
//!     ├── NotificationBus (notify) ──▶ chat transport
//!     └── SessionRegistry (domain)
//! ```
//!
//! Every financial effect commits inside one store transaction; notices go
//! out only after the commit, best-effort.

pub mod app;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod notify;
pub mod service;
pub mod store;
pub mod telemetry;

pub use app::Wallet;
pub use config::WalletConfig;
pub use error::{WalletError, WalletResult};
