//! Balance store traits and the PostgreSQL implementation.
//!
//! The ledger only talks to storage through [`BalanceRepository`] and the
//! [`BalanceTransaction`] it hands out, so the engine can be exercised against
//! the in-process store in tests and against PostgreSQL in production.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use super::config::{ConfigError, check_timeouts};
use super::timeouts::with_timeout;
use crate::ledger::{Account, AccountId, LedgerError, LedgerResult};

/// Balance store operations that run outside a mutation transaction
#[async_trait]
pub trait BalanceRepository: Send + Sync {
    /// Begin a transaction
    async fn begin(&self) -> LedgerResult<Box<dyn BalanceTransaction>>;

    /// Read the committed account row without taking a lock
    async fn find_account(&self, account_id: AccountId) -> LedgerResult<Option<Account>>;

    /// Insert a new account with a zero balance
    async fn create_account(&self) -> LedgerResult<Account>;
}

/// One open balance-store transaction.
///
/// Row locks taken by [`lock_and_read`](Self::lock_and_read) are held until
/// [`commit`](Self::commit) or [`rollback`](Self::rollback), or until the
/// transaction is dropped, which rolls back.
#[async_trait]
pub trait BalanceTransaction: Send {
    /// Lock the account row exclusively and return its balance.
    ///
    /// Blocks while another transaction holds the lock. A lock wait past the
    /// configured timeout fails with `LedgerError::TransactionFailure`.
    async fn lock_and_read(&mut self, account_id: AccountId) -> LedgerResult<Decimal>;

    /// Stage a new balance for a row previously locked in this transaction
    async fn write_balance(&mut self, account_id: AccountId, balance: Decimal) -> LedgerResult<()>;

    async fn commit(&mut self) -> LedgerResult<()>;

    /// Roll back. A no-op once the transaction has been committed.
    async fn rollback(&mut self) -> LedgerResult<()>;
}

/// Default PostgreSQL implementation of `BalanceRepository`
#[derive(Clone)]
pub struct PgBalanceRepository {
    pool: PgPool,
    lock_timeout: Duration,
    statement_timeout: Duration,
}

impl PgBalanceRepository {
    /// Create the store over an existing pool
    ///
    /// # Errors
    ///
    /// * `ConfigError::Invalid` - `lock_timeout` is zero or not below
    ///   `statement_timeout`
    pub fn new(
        pool: PgPool,
        lock_timeout: Duration,
        statement_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        check_timeouts(lock_timeout, statement_timeout)?;
        Ok(Self {
            pool,
            lock_timeout,
            statement_timeout,
        })
    }
}

/// Per-transaction server-side limits, run right after `BEGIN`.
///
/// `SET` cannot take bind parameters; both values are integers we own.
fn local_timeout_statements(lock_timeout: Duration, statement_timeout: Duration) -> [String; 2] {
    [
        format!("SET LOCAL lock_timeout = '{}ms'", lock_timeout.as_millis()),
        format!(
            "SET LOCAL statement_timeout = '{}ms'",
            statement_timeout.as_millis()
        ),
    ]
}

fn account_from_row(row: &PgRow) -> Account {
    Account {
        id: row.get("id"),
        balance: row.get("balance"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
    }
}

#[async_trait]
impl BalanceRepository for PgBalanceRepository {
    async fn begin(&self) -> LedgerResult<Box<dyn BalanceTransaction>> {
        let mut tx = with_timeout(self.statement_timeout, self.pool.begin()).await?;

        for statement in local_timeout_statements(self.lock_timeout, self.statement_timeout) {
            with_timeout(
                self.statement_timeout,
                sqlx::query(&statement).execute(&mut *tx),
            )
            .await?;
        }

        Ok(Box::new(PgBalanceTransaction {
            tx: Some(tx),
            statement_timeout: self.statement_timeout,
        }))
    }

    async fn find_account(&self, account_id: AccountId) -> LedgerResult<Option<Account>> {
        let row = with_timeout(
            self.statement_timeout,
            sqlx::query(
                "SELECT id, balance, created_at, updated_at FROM accounts WHERE id = $1",
            )
            .bind(account_id)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(account_from_row))
    }

    async fn create_account(&self) -> LedgerResult<Account> {
        let row = with_timeout(
            self.statement_timeout,
            sqlx::query(
                "INSERT INTO accounts (balance) VALUES (0)
                 RETURNING id, balance, created_at, updated_at",
            )
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(account_from_row(&row))
    }
}

/// PostgreSQL transaction; `tx` is `None` once committed or rolled back
struct PgBalanceTransaction {
    tx: Option<Transaction<'static, Postgres>>,
    statement_timeout: Duration,
}

impl PgBalanceTransaction {
    fn open(&mut self) -> LedgerResult<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| LedgerError::TransactionFailure("transaction already closed".into()))
    }
}

#[async_trait]
impl BalanceTransaction for PgBalanceTransaction {
    async fn lock_and_read(&mut self, account_id: AccountId) -> LedgerResult<Decimal> {
        let timeout = self.statement_timeout;
        let tx = self.open()?;

        // Blocks concurrent FOR UPDATE readers of this row until we finish
        let row = with_timeout(
            timeout,
            sqlx::query("SELECT balance FROM accounts WHERE id = $1 FOR UPDATE")
                .bind(account_id)
                .fetch_optional(&mut **tx),
        )
        .await?
        .ok_or(LedgerError::AccountNotFound(account_id))?;

        Ok(row.get("balance"))
    }

    async fn write_balance(&mut self, account_id: AccountId, balance: Decimal) -> LedgerResult<()> {
        let timeout = self.statement_timeout;
        let tx = self.open()?;

        let result = with_timeout(
            timeout,
            sqlx::query("UPDATE accounts SET balance = $1, updated_at = NOW() WHERE id = $2")
                .bind(balance)
                .bind(account_id)
                .execute(&mut **tx),
        )
        .await?;

        if result.rows_affected() != 1 {
            return Err(LedgerError::TransactionFailure(format!(
                "balance update touched {} rows",
                result.rows_affected()
            )));
        }
        Ok(())
    }

    async fn commit(&mut self) -> LedgerResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| LedgerError::TransactionFailure("transaction already closed".into()))?;
        // No client-side timeout: dropping an in-flight COMMIT leaves its
        // outcome unknown. The server's statement_timeout bounds it instead,
        // and a cancelled COMMIT aborts the transaction.
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> LedgerResult<()> {
        match self.tx.take() {
            Some(tx) => {
                with_timeout(self.statement_timeout, tx.rollback()).await?;
                Ok(())
            }
            None => Ok(()),
        }
    }
}
