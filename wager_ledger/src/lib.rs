//! # Wager Ledger
//!
//! A single-currency balance ledger with atomic deposits and withdrawals and a
//! randomized wager that settles through the same transactional path.
//!
//! ## Architecture
//!
//! - **Balance store** ([`db`]): one row per account, accessed through the
//!   [`db::BalanceRepository`] trait. The PostgreSQL implementation locks rows
//!   with `SELECT ... FOR UPDATE`; the in-process one with per-row async
//!   mutexes. Both bound lock waits and roll back on drop.
//! - **Mutation engine** ([`ledger`]): [`LedgerManager::deposit`] and
//!   [`LedgerManager::withdraw`], each one transaction that locks, re-reads,
//!   checks, writes and commits.
//! - **Wager resolver** ([`wager`]): draws an outcome in `[-stake, 2 * stake)`
//!   and applies it through the ledger.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use rust_decimal::Decimal;
//! use wager_ledger::{LedgerManager, MemoryBalanceRepository};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), wager_ledger::LedgerError> {
//! let store = MemoryBalanceRepository::new();
//! let account = store.seed_account(Decimal::new(10000, 2)).await;
//! let ledger = LedgerManager::new(Arc::new(store));
//!
//! let balance = ledger.withdraw(account.id, Decimal::new(4000, 2), "withdraw").await?;
//! assert_eq!(balance, Decimal::new(6000, 2));
//! # Ok(())
//! # }
//! ```

/// Connection pooling, configuration and the balance store.
pub mod db;
pub use db::{
    BalanceRepository, BalanceTransaction, Database, DatabaseConfig, MemoryBalanceRepository,
    PgBalanceRepository,
};

/// Atomic balance mutations.
pub mod ledger;
pub use ledger::{Account, AccountId, LedgerError, LedgerManager, LedgerResult};

/// Randomized wager settlement.
pub mod wager;
pub use wager::{OutcomeSource, UniformOutcome, WagerOutcome, WagerResolver, WagerResult};
