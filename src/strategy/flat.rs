//! Flat sizing: bets that ignore prior outcomes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::GameRecord;

/// Same amount every game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedAmount {
    pub amount: Decimal,
}

impl FixedAmount {
    pub fn new(amount: Decimal) -> Self {
        Self { amount }
    }

    pub fn propose(&self, _stake: Decimal) -> Decimal {
        self.amount
    }

    pub fn observe(&mut self, _last: &GameRecord) {}
}

/// A fixed fraction of the current stake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentageOfStake {
    /// Fraction in `(0, 1]`, e.g. `0.05` for 5%.
    pub fraction: Decimal,
}

impl PercentageOfStake {
    pub fn new(fraction: Decimal) -> Self {
        Self { fraction }
    }

    pub fn propose(&self, stake: Decimal) -> Decimal {
        stake * self.fraction
    }

    pub fn observe(&mut self, _last: &GameRecord) {}
}
