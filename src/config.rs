//! Configuration loading from TOML.
//!
//! Reads `config.toml` (or the file named by `WAGER_SIM_CONFIG`) and
//! deserializes it into strongly-typed structs. Only `[session]` is
//! required; every other section falls back to its defaults.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;

use crate::engine::odds::OddsConfiguration;
use crate::engine::outcome::OutcomeConfig;
use crate::strategy::StrategyConfig;
use crate::types::{SessionParameters, SimError};

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Env var that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "WAGER_SIM_CONFIG";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub simulator: SimulatorConfig,
    pub session: SessionParameters,
    #[serde(default)]
    pub odds: OddsConfiguration,
    #[serde(default)]
    pub outcome: OutcomeConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Settings for the demo runner.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulatorConfig {
    pub name: String,
    pub gambler_id: String,
    /// Games played per auto-play batch.
    pub games_per_batch: u32,
    /// Delay between auto-played games. Zero plays the batch in one go.
    pub auto_play_delay_ms: u64,
    /// Where to write the final session snapshot, if anywhere.
    pub snapshot_path: Option<String>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            name: "WAGER-SIM".to_string(),
            gambler_id: "gambler-001".to_string(),
            games_per_batch: 100,
            auto_play_delay_ms: 0,
            snapshot_path: None,
        }
    }
}

/// Acceptable ranges for user-supplied numbers. Checked before a session
/// is created.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_stake: Decimal,
    pub max_stake: Decimal,
    pub min_bet: Decimal,
    pub max_bet: Decimal,
    pub min_probability: f64,
    pub max_probability: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_stake: dec!(1),
            max_stake: dec!(1000000),
            min_bet: dec!(1),
            max_bet: dec!(100000),
            min_probability: 0.01,
            max_probability: 0.99,
        }
    }
}

impl ValidationConfig {
    /// Reject parameters whose numbers fall outside the configured ranges.
    pub fn check_parameters(&self, params: &SessionParameters) -> Result<(), SimError> {
        let stake_range = self.min_stake..=self.max_stake;
        for (label, value) in [
            ("initial stake", params.initial_stake),
            ("upper limit", params.upper_limit),
        ] {
            if !stake_range.contains(&value) {
                return Err(SimError::InvalidParameters(format!(
                    "{label} {value} outside [{}, {}]",
                    self.min_stake, self.max_stake
                )));
            }
        }
        if params.lower_limit > self.max_stake {
            return Err(SimError::InvalidParameters(format!(
                "lower limit {} above maximum stake {}",
                params.lower_limit, self.max_stake
            )));
        }

        let bet_range = self.min_bet..=self.max_bet;
        for (label, value) in [
            ("minimum bet", params.min_bet_amount),
            ("maximum bet", params.max_bet_amount),
        ] {
            if !bet_range.contains(&value) {
                return Err(SimError::InvalidParameters(format!(
                    "{label} {value} outside [{}, {}]",
                    self.min_bet, self.max_bet
                )));
            }
        }

        self.check_probability(params.default_win_probability)
    }

    pub fn check_probability(&self, p: f64) -> Result<(), SimError> {
        if (self.min_probability..=self.max_probability).contains(&p) {
            Ok(())
        } else {
            Err(SimError::InvalidProbability(p))
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Invalid TOML configuration")?;
        Ok(config)
    }

    /// Path from `WAGER_SIM_CONFIG`, or `config.toml`.
    pub fn resolve_path() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }
}
