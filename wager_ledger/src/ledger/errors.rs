//! Ledger error types.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::db::timeouts::TimeoutError;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Amount is not strictly positive or carries more precision than the balance scale
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// Balance is lower than the requested debit
    #[error("Insufficient funds for account {account_id}: available {available}, required {required}")]
    InsufficientFunds {
        account_id: i64,
        available: Decimal,
        required: Decimal,
    },

    /// Account row does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    /// Credit would push the balance past `MAX_BALANCE`
    #[error("Balance overflow for account {account_id}")]
    BalanceOverflow { account_id: i64 },

    /// Losing wager could not be settled because the balance moved after the advisory check
    #[error(
        "Settlement conflict for account {account_id}: available {available}, required {required}"
    )]
    SettlementConflict {
        account_id: i64,
        available: Decimal,
        required: Decimal,
    },

    /// Outcome source produced a value outside `[-stake, 2 * stake)`
    #[error("Wager outcome {outcome} out of range for stake {stake}")]
    OutcomeOutOfRange { stake: Decimal, outcome: Decimal },

    /// Infrastructure failure; the transaction was rolled back
    #[error("Transaction failed: {0}")]
    TransactionFailure(String),
}

impl LedgerError {
    /// Whether the caller may safely retry the whole operation.
    ///
    /// Only infrastructure failures qualify: the engine guarantees rollback
    /// before surfacing them, so the balance is untouched.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::TransactionFailure(_))
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Infrastructure errors are reduced to a generic message and account IDs
    /// are redacted.
    pub fn client_message(&self) -> String {
        match self {
            LedgerError::TransactionFailure(_) => "Temporary failure, please retry".to_string(),
            LedgerError::AccountNotFound(_) => "Account not found".to_string(),
            LedgerError::InsufficientFunds { .. } => "Insufficient balance".to_string(),
            LedgerError::BalanceOverflow { .. } => "Balance limit exceeded".to_string(),
            LedgerError::SettlementConflict { .. } => {
                "Balance changed while settling the wager".to_string()
            }
            LedgerError::OutcomeOutOfRange { .. } => "Internal server error".to_string(),
            LedgerError::InvalidAmount(_) => "Amount should be greater than 0".to_string(),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::TransactionFailure(err.to_string())
    }
}

impl From<TimeoutError> for LedgerError {
    fn from(err: TimeoutError) -> Self {
        LedgerError::TransactionFailure(err.to_string())
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
