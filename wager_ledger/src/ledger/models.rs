//! Ledger data models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::{LedgerError, LedgerResult};

/// Account ID type
pub type AccountId = i64;

/// Number of fractional digits stored for every balance (`NUMERIC(18,2)`)
pub const BALANCE_SCALE: u32 = 2;

/// Largest balance representable by the `NUMERIC(18,2)` column
pub const MAX_BALANCE: Decimal = Decimal::from_parts(2_808_348_671, 232_830_643, 0, false, 2);

/// Description tag for a plain deposit
pub const DEPOSIT: &str = "deposit";
/// Description tag for a plain withdrawal
pub const WITHDRAW: &str = "withdraw";
/// Description tag for a winning wager settlement
pub const BET_WON: &str = "bet-won";
/// Description tag for a losing wager settlement
pub const BET_LOSE: &str = "bet-lose";

/// Account balance record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Credit,
    Debit,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Credit => write!(f, "credit"),
            Direction::Debit => write!(f, "debit"),
        }
    }
}

/// A single validated balance mutation.
///
/// Only constructible through [`MutationRequest::new`], so an instance always
/// carries a strictly positive amount at the balance scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRequest {
    account_id: AccountId,
    amount: Decimal,
    direction: Direction,
    description: String,
}

impl MutationRequest {
    /// Create a mutation request
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidAmount` - Amount is not positive or too precise
    pub fn new(
        account_id: AccountId,
        amount: Decimal,
        direction: Direction,
        description: impl Into<String>,
    ) -> LedgerResult<Self> {
        validate_amount(amount)?;
        Ok(Self {
            account_id,
            amount,
            direction,
            description: description.into(),
        })
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Compute the balance that results from applying this request to `current`
    ///
    /// # Errors
    ///
    /// * `LedgerError::InsufficientFunds` - Debit larger than `current`
    /// * `LedgerError::BalanceOverflow` - Credit would exceed `MAX_BALANCE`
    pub fn apply_to(&self, current: Decimal) -> LedgerResult<Decimal> {
        match self.direction {
            Direction::Credit => current
                .checked_add(self.amount)
                .filter(|next| *next <= MAX_BALANCE)
                .ok_or(LedgerError::BalanceOverflow {
                    account_id: self.account_id,
                }),
            Direction::Debit => {
                if current < self.amount {
                    return Err(LedgerError::InsufficientFunds {
                        account_id: self.account_id,
                        available: current,
                        required: self.amount,
                    });
                }
                Ok(current - self.amount)
            }
        }
    }
}

/// Check that an amount is strictly positive and fits the balance scale
///
/// # Errors
///
/// * `LedgerError::InvalidAmount` - Amount is zero, negative, or has more
///   than `BALANCE_SCALE` fractional digits
pub fn validate_amount(amount: Decimal) -> LedgerResult<()> {
    if amount <= Decimal::ZERO || amount.normalize().scale() > BALANCE_SCALE {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}
