//! Wager data models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::AccountId;

/// Which side of the outcome range the draw landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WagerResult {
    Won,
    Lost,
}

impl std::fmt::Display for WagerResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WagerResult::Won => write!(f, "won"),
            WagerResult::Lost => write!(f, "lost"),
        }
    }
}

/// Settled wager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WagerOutcome {
    pub account_id: AccountId,
    pub stake: Decimal,
    pub result: WagerResult,
    /// Amount applied to the balance, never negative
    pub magnitude: Decimal,
    /// Balance after settlement
    pub balance: Decimal,
}

impl WagerOutcome {
    /// Signed change applied to the balance
    pub fn delta(&self) -> Decimal {
        match self.result {
            WagerResult::Won => self.magnitude,
            WagerResult::Lost => -self.magnitude,
        }
    }
}
