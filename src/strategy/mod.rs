//! Bet sizing: the closed family of staking systems.
//!
//! A `BetSizer` owns one strategy for the lifetime of a session. Each call
//! to `next` folds in the most recent settled wager (and only that one),
//! then proposes an amount clamped to `[min_bet, min(max_bet, stake)]`.

pub mod fibonacci;
pub mod flat;
pub mod progression;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::types::{GameRecord, SimError};
use fibonacci::Fibonacci;
use flat::{FixedAmount, PercentageOfStake};
use progression::{DAlembert, Martingale, ReverseMartingale};

// ---------------------------------------------------------------------------
// Strategy variants
// ---------------------------------------------------------------------------

/// Every supported staking system with its own progression state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BetSizingStrategy {
    Fixed(FixedAmount),
    Percentage(PercentageOfStake),
    Martingale(Martingale),
    ReverseMartingale(ReverseMartingale),
    DAlembert(DAlembert),
    Fibonacci(Fibonacci),
}

impl BetSizingStrategy {
    /// Raw proposal before clamping.
    pub fn propose(&self, stake: Decimal) -> Decimal {
        match self {
            BetSizingStrategy::Fixed(s) => s.propose(stake),
            BetSizingStrategy::Percentage(s) => s.propose(stake),
            BetSizingStrategy::Martingale(s) => s.propose(stake),
            BetSizingStrategy::ReverseMartingale(s) => s.propose(stake),
            BetSizingStrategy::DAlembert(s) => s.propose(stake),
            BetSizingStrategy::Fibonacci(s) => s.propose(stake),
        }
    }

    /// Advance the progression by one settled wager.
    pub fn observe(&mut self, last: &GameRecord) {
        match self {
            BetSizingStrategy::Fixed(s) => s.observe(last),
            BetSizingStrategy::Percentage(s) => s.observe(last),
            BetSizingStrategy::Martingale(s) => s.observe(last),
            BetSizingStrategy::ReverseMartingale(s) => s.observe(last),
            BetSizingStrategy::DAlembert(s) => s.observe(last),
            BetSizingStrategy::Fibonacci(s) => s.observe(last),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BetSizingStrategy::Fixed(_) => "Fixed Amount",
            BetSizingStrategy::Percentage(_) => "Percentage of Stake",
            BetSizingStrategy::Martingale(_) => "Martingale",
            BetSizingStrategy::ReverseMartingale(_) => "Reverse Martingale",
            BetSizingStrategy::DAlembert(_) => "D'Alembert",
            BetSizingStrategy::Fibonacci(_) => "Fibonacci",
        }
    }
}

impl fmt::Display for BetSizingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetSizingStrategy::Fixed(s) => write!(f, "Fixed Amount (${:.2})", s.amount),
            BetSizingStrategy::Percentage(s) => {
                write!(f, "Percentage of Stake ({:.1}%)", s.fraction * Decimal::ONE_HUNDRED)
            }
            BetSizingStrategy::Martingale(s) => write!(f, "Martingale (base ${:.2})", s.base),
            BetSizingStrategy::ReverseMartingale(s) => {
                write!(f, "Reverse Martingale (base ${:.2})", s.base)
            }
            BetSizingStrategy::DAlembert(s) => {
                write!(f, "D'Alembert (base ${:.2}, step ${:.2})", s.base, s.increment)
            }
            BetSizingStrategy::Fibonacci(s) => write!(f, "Fibonacci (base ${:.2})", s.base),
        }
    }
}

// ---------------------------------------------------------------------------
// Sizer
// ---------------------------------------------------------------------------

/// Session-owned strategy plus a cursor into the game history.
///
/// `observed` counts the records already folded in, so repeated calls with
/// the same history do not advance the progression twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetSizer {
    strategy: BetSizingStrategy,
    observed: usize,
}

impl BetSizer {
    pub fn new(strategy: BetSizingStrategy) -> Self {
        Self {
            strategy,
            observed: 0,
        }
    }

    pub fn strategy(&self) -> &BetSizingStrategy {
        &self.strategy
    }

    /// Next wager amount given the session's history so far.
    pub fn next(
        &mut self,
        stake: Decimal,
        min_bet: Decimal,
        max_bet: Decimal,
        history: &[GameRecord],
    ) -> Decimal {
        if history.len() > self.observed {
            if let Some(last) = history.last() {
                self.strategy.observe(last);
            }
            self.observed = history.len();
        }

        let proposed = self.strategy.propose(stake);
        let amount = clamp_bet(proposed, min_bet, max_bet, stake);

        debug!(
            strategy = self.strategy.name(),
            stake = %stake,
            proposed = %proposed,
            amount = %amount,
            "Bet sized"
        );

        amount
    }
}

/// Clamp to `[min_bet, min(max_bet, stake)]`. When the stake is below the
/// minimum bet the upper bound wins, so the result never exceeds the stake.
pub fn clamp_bet(amount: Decimal, min_bet: Decimal, max_bet: Decimal, stake: Decimal) -> Decimal {
    amount.max(min_bet).min(max_bet.min(stake))
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Strategy selection as written in config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    Fixed { amount: Decimal },
    Percentage { fraction: Decimal },
    Martingale { base: Decimal },
    ReverseMartingale { base: Decimal },
    #[serde(alias = "dalembert")]
    DAlembert { base: Decimal, increment: Decimal },
    Fibonacci { base: Decimal },
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig::Fixed {
            amount: Decimal::from(50),
        }
    }
}

impl StrategyConfig {
    pub fn build(&self) -> Result<BetSizer, SimError> {
        let positive = |value: Decimal| {
            if value > Decimal::ZERO {
                Ok(value)
            } else {
                Err(SimError::InvalidAmount(value))
            }
        };

        let strategy = match *self {
            StrategyConfig::Fixed { amount } => {
                BetSizingStrategy::Fixed(FixedAmount::new(positive(amount)?))
            }
            StrategyConfig::Percentage { fraction } => {
                if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
                    return Err(SimError::InvalidParameters(format!(
                        "stake fraction must be in (0, 1], got {fraction}"
                    )));
                }
                BetSizingStrategy::Percentage(PercentageOfStake::new(fraction))
            }
            StrategyConfig::Martingale { base } => {
                BetSizingStrategy::Martingale(Martingale::new(positive(base)?))
            }
            StrategyConfig::ReverseMartingale { base } => {
                BetSizingStrategy::ReverseMartingale(ReverseMartingale::new(positive(base)?))
            }
            StrategyConfig::DAlembert { base, increment } => {
                if increment < Decimal::ZERO {
                    return Err(SimError::InvalidAmount(increment));
                }
                BetSizingStrategy::DAlembert(DAlembert::new(positive(base)?, increment))
            }
            StrategyConfig::Fibonacci { base } => {
                BetSizingStrategy::Fibonacci(Fibonacci::new(positive(base)?))
            }
        };

        Ok(BetSizer::new(strategy))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
