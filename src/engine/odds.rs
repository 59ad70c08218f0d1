//! Odds model: turns a bet and a win probability into a payout.
//!
//! The payout is the amount credited on a win, excluding the returned
//! stake. Money is `Decimal`; the probability arrives as `f64` and is
//! converted once at the boundary.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::SimError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How the multiplier and probability combine into a payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OddsScheme {
    /// `bet × multiplier`
    Fixed,
    /// `bet × (1/p − 1) × multiplier`
    ProbabilityBased,
    /// `bet × (multiplier − 1)`
    Decimal,
    /// Moneyline derived from the probability, favourite above 0.5.
    American,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OddsConfiguration {
    pub multiplier: Decimal,
    pub scheme: OddsScheme,
}

impl Default for OddsConfiguration {
    fn default() -> Self {
        Self {
            multiplier: Decimal::ONE,
            scheme: OddsScheme::ProbabilityBased,
        }
    }
}

// ---------------------------------------------------------------------------
// Odds model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OddsModel {
    config: OddsConfiguration,
}

impl OddsModel {
    pub fn new(config: OddsConfiguration) -> Result<Self, SimError> {
        if config.multiplier <= Decimal::ZERO {
            return Err(SimError::InvalidParameters(format!(
                "odds multiplier must be positive, got {}",
                config.multiplier
            )));
        }
        if config.scheme == OddsScheme::Decimal && config.multiplier < Decimal::ONE {
            return Err(SimError::InvalidParameters(format!(
                "decimal odds must be at least 1.0, got {}",
                config.multiplier
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &OddsConfiguration {
        &self.config
    }

    /// Payout credited if a bet of `bet` at `win_probability` wins.
    pub fn payout(&self, bet: Decimal, win_probability: f64) -> Result<Decimal, SimError> {
        check_probability(win_probability)?;

        let multiplier = self.config.multiplier;
        let degenerate = || SimError::InvalidProbability(win_probability);
        let payout = match self.config.scheme {
            OddsScheme::Fixed => bet.checked_mul(multiplier),
            OddsScheme::ProbabilityBased => bet
                .checked_mul(fair_odds(win_probability)?)
                .and_then(|v| v.checked_mul(multiplier)),
            OddsScheme::Decimal => bet.checked_mul(multiplier - Decimal::ONE),
            OddsScheme::American => {
                let line = american_line(win_probability)?;
                if line.is_sign_negative() {
                    // Favourite: stake |line| to win 100.
                    dec!(100)
                        .checked_div(line.abs())
                        .and_then(|ratio| bet.checked_mul(ratio))
                } else {
                    // Underdog: stake 100 to win line.
                    bet.checked_mul(line / dec!(100))
                }
            }
        }
        .ok_or_else(degenerate)?;

        debug!(
            scheme = ?self.config.scheme,
            bet = %bet,
            win_probability,
            payout = %payout,
            "Payout computed"
        );

        Ok(payout)
    }
}

/// Reject probabilities outside `[0, 1]` (and NaN).
pub fn check_probability(p: f64) -> Result<(), SimError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(SimError::InvalidProbability(p))
    }
}

/// Net fair odds `1/p − 1`. Undefined at 0 and 1, and for any `p` too
/// small to survive conversion to `Decimal`.
pub fn fair_odds(p: f64) -> Result<Decimal, SimError> {
    if p <= 0.0 || p >= 1.0 {
        return Err(SimError::InvalidProbability(p));
    }
    let p_dec = Decimal::from_f64(p)
        .filter(|d| !d.is_zero())
        .ok_or(SimError::InvalidProbability(p))?;
    Decimal::ONE
        .checked_div(p_dec)
        .map(|inverse| inverse - Decimal::ONE)
        .ok_or(SimError::InvalidProbability(p))
}

/// American moneyline implied by a win probability: negative for a
/// favourite (`p > 0.5`), positive otherwise.
pub fn american_line(p: f64) -> Result<Decimal, SimError> {
    let odds = fair_odds(p)?;
    let line = if p > 0.5 {
        dec!(100).checked_div(odds).map(|v| -v)
    } else {
        dec!(100).checked_mul(odds)
    };
    line.ok_or(SimError::InvalidProbability(p))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
