//! Outcome sources: decide whether a wager wins.
//!
//! Every source owns its own RNG. Nothing here touches a process-wide
//! generator, so a seeded source replays the same win/loss sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::SimError;

/// Decides win/loss for a given probability.
#[cfg_attr(test, mockall::automock)]
pub trait OutcomeSource {
    fn decide(&mut self, win_probability: f64) -> bool;

    /// Human-readable name for logs and summaries.
    fn name(&self) -> String;
}

// ---------------------------------------------------------------------------
// Uniform random
// ---------------------------------------------------------------------------

/// Fair draw: wins when a uniform sample in `[0, 1)` falls below `p`.
#[derive(Debug, Clone)]
pub struct RandomOutcome {
    rng: StdRng,
    seed: Option<u64>,
}

impl RandomOutcome {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

impl OutcomeSource for RandomOutcome {
    fn decide(&mut self, win_probability: f64) -> bool {
        self.rng.gen::<f64>() < win_probability
    }

    fn name(&self) -> String {
        match self.seed {
            Some(seed) => format!("Random (seed {seed})"),
            None => "Random".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// House edge
// ---------------------------------------------------------------------------

/// Shaves the house edge off the probability before drawing:
/// `effective = p × (1 − house_edge)`.
#[derive(Debug, Clone)]
pub struct HouseEdgeOutcome {
    rng: StdRng,
    house_edge: f64,
}

impl HouseEdgeOutcome {
    pub fn new(house_edge: f64, seed: Option<u64>) -> Result<Self, SimError> {
        if !(0.0..1.0).contains(&house_edge) {
            return Err(SimError::InvalidParameters(format!(
                "house edge must be in [0, 1), got {house_edge}"
            )));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { rng, house_edge })
    }

    pub fn house_edge(&self) -> f64 {
        self.house_edge
    }

    pub fn effective_probability(&self, win_probability: f64) -> f64 {
        win_probability * (1.0 - self.house_edge)
    }
}

impl OutcomeSource for HouseEdgeOutcome {
    fn decide(&mut self, win_probability: f64) -> bool {
        let effective = self.effective_probability(win_probability);
        debug!(win_probability, effective, "House edge applied");
        self.rng.gen::<f64>() < effective
    }

    fn name(&self) -> String {
        format!("Weighted (house edge {:.1}%)", self.house_edge * 100.0)
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which outcome source a session should use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeConfig {
    Random {
        #[serde(default)]
        seed: Option<u64>,
    },
    HouseEdge {
        house_edge: f64,
        #[serde(default)]
        seed: Option<u64>,
    },
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        OutcomeConfig::Random { seed: None }
    }
}

impl OutcomeConfig {
    pub fn build(&self) -> Result<Box<dyn OutcomeSource>, SimError> {
        Ok(match *self {
            OutcomeConfig::Random { seed: Some(seed) } => Box::new(RandomOutcome::seeded(seed)),
            OutcomeConfig::Random { seed: None } => Box::new(RandomOutcome::from_entropy()),
            OutcomeConfig::HouseEdge { house_edge, seed } => {
                Box::new(HouseEdgeOutcome::new(house_edge, seed)?)
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
