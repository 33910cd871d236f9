//! Wager resolver: settles a stake through the ledger.

use std::sync::Arc;

use rust_decimal::Decimal;

use super::{
    models::{WagerOutcome, WagerResult},
    outcome::{OutcomeSource, check_outcome},
};
use crate::ledger::{
    AccountId, BET_LOSE, BET_WON, LedgerError, LedgerManager, LedgerResult, validate_amount,
};

/// Wager resolver
#[derive(Clone)]
pub struct WagerResolver {
    ledger: LedgerManager,
    outcomes: Arc<dyn OutcomeSource>,
}

impl WagerResolver {
    /// Create a new wager resolver
    ///
    /// # Arguments
    ///
    /// * `ledger` - Ledger used to apply settlements
    /// * `outcomes` - Source of signed outcomes
    pub fn new(ledger: LedgerManager, outcomes: Arc<dyn OutcomeSource>) -> Self {
        Self { ledger, outcomes }
    }

    /// Place a wager and settle it
    ///
    /// # Arguments
    ///
    /// * `account_id` - Account ID
    /// * `stake` - Amount risked, strictly positive
    ///
    /// # Returns
    ///
    /// * `LedgerResult<WagerOutcome>` - Settled outcome or error
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidAmount` - Stake not positive
    /// * `LedgerError::InsufficientFunds` - Committed balance lower than the stake
    /// * `LedgerError::SettlementConflict` - Balance dropped below the loss
    ///   between the check and settlement; nothing was applied
    /// * `LedgerError::OutcomeOutOfRange` - Outcome source misbehaved; nothing was applied
    pub async fn place_wager(
        &self,
        account_id: AccountId,
        stake: Decimal,
    ) -> LedgerResult<WagerOutcome> {
        validate_amount(stake)?;

        // Advisory only: the losing path re-checks under the row lock
        let account = self.ledger.balance(account_id).await?;
        if account.balance < stake {
            return Err(LedgerError::InsufficientFunds {
                account_id,
                available: account.balance,
                required: stake,
            });
        }

        let outcome = self.outcomes.draw(stake)?;
        check_outcome(stake, outcome)?;
        log::debug!("Wager on account {account_id}: stake {stake}, outcome {outcome}");

        self.settle(account_id, stake, outcome).await
    }

    async fn settle(
        &self,
        account_id: AccountId,
        stake: Decimal,
        outcome: Decimal,
    ) -> LedgerResult<WagerOutcome> {
        if outcome < Decimal::ZERO {
            let magnitude = -outcome;
            let balance = self
                .ledger
                .withdraw(account_id, magnitude, BET_LOSE)
                .await
                .map_err(|err| match err {
                    LedgerError::InsufficientFunds {
                        account_id,
                        available,
                        required,
                    } => LedgerError::SettlementConflict {
                        account_id,
                        available,
                        required,
                    },
                    other => other,
                })?;

            return Ok(WagerOutcome {
                account_id,
                stake,
                result: WagerResult::Lost,
                magnitude,
                balance,
            });
        }

        // A zero draw is a win of nothing; there is no delta to apply
        let balance = if outcome.is_zero() {
            self.ledger.balance(account_id).await?.balance
        } else {
            self.ledger.deposit(account_id, outcome, BET_WON).await?
        };

        Ok(WagerOutcome {
            account_id,
            stake,
            result: WagerResult::Won,
            magnitude: outcome,
            balance,
        })
    }
}
