//! Ledger manager: the transactional balance-mutation engine.

use std::sync::Arc;

use rust_decimal::Decimal;

use super::{
    errors::{LedgerError, LedgerResult},
    models::{Account, AccountId, DEPOSIT, Direction, MutationRequest, WITHDRAW},
};
use crate::db::{BalanceRepository, BalanceTransaction};

/// Ledger manager
#[derive(Clone)]
pub struct LedgerManager {
    store: Arc<dyn BalanceRepository>,
}

impl LedgerManager {
    /// Create a new ledger manager
    ///
    /// # Arguments
    ///
    /// * `store` - Balance store shared by every caller of this manager
    pub fn new(store: Arc<dyn BalanceRepository>) -> Self {
        Self { store }
    }

    /// Open a new account with a zero balance
    pub async fn open_account(&self) -> LedgerResult<Account> {
        let account = self.store.create_account().await?;
        log::info!("Opened account {}", account.id);
        Ok(account)
    }

    /// Get the committed balance of an account without locking it
    ///
    /// The value may be stale by the time the caller acts on it; every
    /// mutation re-reads under the row lock.
    pub async fn balance(&self, account_id: AccountId) -> LedgerResult<Account> {
        self.store
            .find_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    /// Credit an account
    ///
    /// # Arguments
    ///
    /// * `account_id` - Account ID
    /// * `amount` - Amount to add, strictly positive
    /// * `description` - Tag recorded with the mutation (e.g. `deposit`, `bet-won`)
    ///
    /// # Returns
    ///
    /// * `LedgerResult<Decimal>` - New balance or error
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidAmount` - Amount not positive; no transaction is opened
    /// * `LedgerError::BalanceOverflow` - Balance would exceed `MAX_BALANCE`
    pub async fn deposit(
        &self,
        account_id: AccountId,
        amount: Decimal,
        description: &str,
    ) -> LedgerResult<Decimal> {
        let request = MutationRequest::new(account_id, amount, Direction::Credit, description)?;
        self.apply(&request).await
    }

    /// Debit an account if its balance covers the amount
    ///
    /// # Arguments
    ///
    /// * `account_id` - Account ID
    /// * `amount` - Amount to remove, strictly positive
    /// * `description` - Tag recorded with the mutation (e.g. `withdraw`, `bet-lose`)
    ///
    /// # Returns
    ///
    /// * `LedgerResult<Decimal>` - New balance or error
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidAmount` - Amount not positive; no transaction is opened
    /// * `LedgerError::InsufficientFunds` - Locked balance is lower than `amount`
    pub async fn withdraw(
        &self,
        account_id: AccountId,
        amount: Decimal,
        description: &str,
    ) -> LedgerResult<Decimal> {
        let request = MutationRequest::new(account_id, amount, Direction::Debit, description)?;
        self.apply(&request).await
    }

    /// Shorthand for [`deposit`](Self::deposit) tagged `deposit`
    pub async fn deposit_funds(
        &self,
        account_id: AccountId,
        amount: Decimal,
    ) -> LedgerResult<Decimal> {
        self.deposit(account_id, amount, DEPOSIT).await
    }

    /// Shorthand for [`withdraw`](Self::withdraw) tagged `withdraw`
    pub async fn withdraw_funds(
        &self,
        account_id: AccountId,
        amount: Decimal,
    ) -> LedgerResult<Decimal> {
        self.withdraw(account_id, amount, WITHDRAW).await
    }

    /// Run one request as lock, read, check, write, commit.
    ///
    /// Any failure after `begin` rolls the transaction back before returning.
    pub async fn apply(&self, request: &MutationRequest) -> LedgerResult<Decimal> {
        let mut tx = self.store.begin().await?;

        let new_balance = match Self::mutate(tx.as_mut(), request).await {
            Ok(balance) => balance,
            Err(err) => {
                Self::abort(tx.as_mut(), request, &err).await;
                return Err(err);
            }
        };

        if let Err(err) = tx.commit().await {
            Self::abort(tx.as_mut(), request, &err).await;
            return Err(err);
        }

        log::info!(
            "Committed {} ({} {}) on account {}, balance {}",
            request.description(),
            request.direction(),
            request.amount(),
            request.account_id(),
            new_balance
        );
        Ok(new_balance)
    }

    async fn mutate(
        tx: &mut dyn BalanceTransaction,
        request: &MutationRequest,
    ) -> LedgerResult<Decimal> {
        let current = tx.lock_and_read(request.account_id()).await?;
        let new_balance = request.apply_to(current)?;
        tx.write_balance(request.account_id(), new_balance).await?;
        Ok(new_balance)
    }

    async fn abort(
        tx: &mut dyn BalanceTransaction,
        request: &MutationRequest,
        cause: &LedgerError,
    ) {
        log::debug!(
            "Rolling back {} on account {}: {}",
            request.description(),
            request.account_id(),
            cause
        );
        if let Err(rollback_err) = tx.rollback().await {
            log::warn!(
                "Rollback failed for account {}: {}",
                request.account_id(),
                rollback_err
            );
        }
    }
}
