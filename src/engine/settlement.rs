//! Wager settlement: one bet from validation to ledger entry.
//!
//! Order of work for a single wager:
//! 1. price the win payout (fails fast on a bad probability),
//! 2. make sure a loss could not breach the ledger floor,
//! 3. draw the outcome,
//! 4. apply it to the ledger and build the `GameRecord`.
//!
//! Nothing is drawn or committed if an earlier step fails.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Instant;
use tracing::{debug, info};

use super::ledger::{LedgerUpdate, StakeLedger};
use super::odds::OddsModel;
use super::outcome::OutcomeSource;
use crate::types::{GameOutcome, GameRecord, SessionParameters, SimError};

/// A wager ready for settlement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wager {
    pub sequence: u32,
    pub amount: Decimal,
    pub win_probability: f64,
}

/// What one settlement produced.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub record: GameRecord,
    pub ledger: LedgerUpdate,
}

pub struct WagerSettlementEngine {
    odds: OddsModel,
    outcomes: Box<dyn OutcomeSource>,
}

impl WagerSettlementEngine {
    pub fn new(odds: OddsModel, outcomes: Box<dyn OutcomeSource>) -> Self {
        Self { odds, outcomes }
    }

    pub fn odds(&self) -> &OddsModel {
        &self.odds
    }

    pub fn outcome_source_name(&self) -> String {
        self.outcomes.name()
    }

    /// Settle `wager` against `ledger`. The caller has already checked the
    /// amount with [`validate_wager`].
    pub fn settle(
        &mut self,
        ledger: &mut StakeLedger,
        wager: &Wager,
        at: DateTime<Utc>,
    ) -> Result<Settlement, SimError> {
        let started = Instant::now();
        let stake_before = ledger.current_stake();

        let win_payout = self.odds.payout(wager.amount, wager.win_probability)?;

        let floor = ledger.min_boundary();
        if stake_before - wager.amount < floor {
            return Err(SimError::BoundaryViolation {
                attempted: stake_before - wager.amount,
                boundary: floor,
            });
        }

        let won = self.outcomes.decide(wager.win_probability);
        let update = if won {
            ledger.apply_outcome(win_payout, true, at)?
        } else {
            ledger.apply_outcome(wager.amount, false, at)?
        };

        let record = GameRecord {
            sequence: wager.sequence,
            bet_amount: wager.amount,
            win_probability: wager.win_probability,
            outcome: GameOutcome::from_won(won),
            // Credited amount, which is below the quoted payout if capped.
            payout: if won {
                update.new_balance - update.previous_balance
            } else {
                Decimal::ZERO
            },
            stake_before,
            stake_after: update.new_balance,
            played_at: at,
            duration_micros: started.elapsed().as_micros() as u64,
        };

        info!(
            game = record.sequence,
            outcome = %record.outcome,
            bet = format!("${:.2}", record.bet_amount),
            payout = format!("${:.2}", record.payout),
            stake = format!("${:.2}", record.stake_after),
            "Wager settled"
        );

        Ok(Settlement {
            record,
            ledger: update,
        })
    }
}

/// Range checks first (`BetOutOfRange`), then affordability
/// (`InsufficientStake`).
pub fn validate_wager(
    params: &SessionParameters,
    stake: Decimal,
    amount: Decimal,
) -> Result<(), SimError> {
    if amount < params.min_bet_amount || amount > params.max_bet_amount {
        return Err(SimError::BetOutOfRange {
            amount,
            min: params.min_bet_amount,
            max: params.max_bet_amount,
        });
    }
    if amount > stake {
        return Err(SimError::InsufficientStake {
            needed: amount,
            available: stake,
        });
    }
    debug!(amount = %amount, stake = %stake, "Wager validated");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
