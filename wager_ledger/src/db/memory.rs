//! In-process balance store.
//!
//! Mirrors the PostgreSQL locking contract: every account row has its own
//! async mutex, a transaction holds the owned guard until it commits or rolls
//! back, and unlocked reads see only committed balances.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::repository::{BalanceRepository, BalanceTransaction};
use super::timeouts::{DEFAULT_LOCK_TIMEOUT, with_lock_timeout};
use crate::ledger::{Account, AccountId, LedgerError, LedgerResult};

struct Row {
    account: Account,
    lock: Arc<Mutex<()>>,
}

#[derive(Default)]
struct Table {
    rows: HashMap<AccountId, Row>,
    next_id: AccountId,
}

/// In-memory implementation of `BalanceRepository`
#[derive(Clone)]
pub struct MemoryBalanceRepository {
    table: Arc<Mutex<Table>>,
    lock_timeout: Duration,
}

impl MemoryBalanceRepository {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            table: Arc::new(Mutex::new(Table::default())),
            lock_timeout,
        }
    }

    /// Insert an account with a starting balance, bypassing the ledger.
    ///
    /// Used to seed fixtures; production accounts always start at zero.
    pub async fn seed_account(&self, balance: Decimal) -> Account {
        let mut table = self.table.lock().await;
        table.next_id += 1;
        let now = Utc::now();
        let account = Account {
            id: table.next_id,
            balance,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(
            account.id,
            Row {
                account: account.clone(),
                lock: Arc::new(Mutex::new(())),
            },
        );
        account
    }
}

impl Default for MemoryBalanceRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceRepository for MemoryBalanceRepository {
    async fn begin(&self) -> LedgerResult<Box<dyn BalanceTransaction>> {
        Ok(Box::new(MemoryTransaction {
            table: Arc::clone(&self.table),
            lock_timeout: self.lock_timeout,
            held: HashMap::new(),
            staged: HashMap::new(),
            closed: false,
        }))
    }

    async fn find_account(&self, account_id: AccountId) -> LedgerResult<Option<Account>> {
        let table = self.table.lock().await;
        Ok(table.rows.get(&account_id).map(|row| row.account.clone()))
    }

    async fn create_account(&self) -> LedgerResult<Account> {
        Ok(self.seed_account(Decimal::ZERO).await)
    }
}

struct MemoryTransaction {
    table: Arc<Mutex<Table>>,
    lock_timeout: Duration,
    held: HashMap<AccountId, OwnedMutexGuard<()>>,
    staged: HashMap<AccountId, Decimal>,
    closed: bool,
}

impl MemoryTransaction {
    fn ensure_open(&self) -> LedgerResult<()> {
        if self.closed {
            return Err(LedgerError::TransactionFailure(
                "transaction already closed".into(),
            ));
        }
        Ok(())
    }

    fn release(&mut self) {
        self.closed = true;
        self.staged.clear();
        self.held.clear();
    }
}

#[async_trait]
impl BalanceTransaction for MemoryTransaction {
    async fn lock_and_read(&mut self, account_id: AccountId) -> LedgerResult<Decimal> {
        self.ensure_open()?;

        if !self.held.contains_key(&account_id) {
            // Clone the row lock out so the table mutex is not held while waiting
            let row_lock = {
                let table = self.table.lock().await;
                table
                    .rows
                    .get(&account_id)
                    .map(|row| Arc::clone(&row.lock))
                    .ok_or(LedgerError::AccountNotFound(account_id))?
            };
            let guard = with_lock_timeout(self.lock_timeout, row_lock.lock_owned()).await?;
            self.held.insert(account_id, guard);
        }

        if let Some(balance) = self.staged.get(&account_id) {
            return Ok(*balance);
        }
        let table = self.table.lock().await;
        table
            .rows
            .get(&account_id)
            .map(|row| row.account.balance)
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    async fn write_balance(&mut self, account_id: AccountId, balance: Decimal) -> LedgerResult<()> {
        self.ensure_open()?;
        if !self.held.contains_key(&account_id) {
            return Err(LedgerError::TransactionFailure(format!(
                "write to account {account_id} without holding its lock"
            )));
        }
        if balance < Decimal::ZERO {
            // Same guarantee as the CHECK (balance >= 0) constraint
            return Err(LedgerError::TransactionFailure(format!(
                "negative balance rejected for account {account_id}"
            )));
        }
        self.staged.insert(account_id, balance);
        Ok(())
    }

    async fn commit(&mut self) -> LedgerResult<()> {
        self.ensure_open()?;
        {
            let mut table = self.table.lock().await;
            let now = Utc::now();
            for (account_id, balance) in self.staged.drain() {
                if let Some(row) = table.rows.get_mut(&account_id) {
                    row.account.balance = balance;
                    row.account.updated_at = now;
                }
            }
        }
        self.release();
        Ok(())
    }

    async fn rollback(&mut self) -> LedgerResult<()> {
        self.release();
        Ok(())
    }
}
