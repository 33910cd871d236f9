//! Ledger module providing atomic balance mutations.
//!
//! Every deposit and withdrawal runs as one store transaction that locks the
//! account row, re-reads the balance under the lock, checks the precondition,
//! writes the new balance and commits. Concurrent mutations of one account are
//! serialized by that lock; different accounts proceed in parallel.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rust_decimal::Decimal;
//! use wager_ledger::db::{Database, DatabaseConfig};
//! use wager_ledger::ledger::LedgerManager;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let db = Database::new(&config).await?;
//!     let ledger = LedgerManager::new(Arc::new(db.balance_repository(&config)?));
//!
//!     let balance = ledger.deposit(1, Decimal::new(2500, 2), "deposit").await?;
//!     println!("New balance: {}", balance);
//!
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{LedgerError, LedgerResult};
pub use manager::LedgerManager;
pub use models::{
    Account, AccountId, BALANCE_SCALE, BET_LOSE, BET_WON, DEPOSIT, Direction, MAX_BALANCE,
    MutationRequest, WITHDRAW, validate_amount,
};
