//! Shared types for the WAGER-SIM core.
//!
//! These types form the data model used across all modules. They are plain
//! data so that the strategy, engine and analytics modules can depend on
//! them without circular references, and so that a session can be
//! serialised and restored as a whole.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of a single settled wager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOutcome {
    Win,
    Loss,
    /// Stake returned, no win and no loss.
    Push,
}

impl GameOutcome {
    pub fn from_won(won: bool) -> Self {
        if won {
            GameOutcome::Win
        } else {
            GameOutcome::Loss
        }
    }
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOutcome::Win => write!(f, "WON"),
            GameOutcome::Loss => write!(f, "LOST"),
            GameOutcome::Push => write!(f, "PUSH"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session lifecycle enums
// ---------------------------------------------------------------------------

/// Session state machine value.
///
/// `Initialized → Active ⇄ Paused → Ended*`. The `Ended*` values are
/// terminal: nothing transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Initialized,
    Active,
    Paused,
    EndedWin,
    EndedLoss,
    EndedManual,
    EndedTimeout,
}

impl SessionStatus {
    /// Every status, in lifecycle order.
    pub const ALL: &'static [SessionStatus] = &[
        SessionStatus::Initialized,
        SessionStatus::Active,
        SessionStatus::Paused,
        SessionStatus::EndedWin,
        SessionStatus::EndedLoss,
        SessionStatus::EndedManual,
        SessionStatus::EndedTimeout,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::EndedWin
                | SessionStatus::EndedLoss
                | SessionStatus::EndedManual
                | SessionStatus::EndedTimeout
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Initialized => write!(f, "INITIALIZED"),
            SessionStatus::Active => write!(f, "ACTIVE"),
            SessionStatus::Paused => write!(f, "PAUSED"),
            SessionStatus::EndedWin => write!(f, "ENDED_WIN"),
            SessionStatus::EndedLoss => write!(f, "ENDED_LOSS"),
            SessionStatus::EndedManual => write!(f, "ENDED_MANUAL"),
            SessionStatus::EndedTimeout => write!(f, "ENDED_TIMEOUT"),
        }
    }
}

/// Why a session reached its terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionEndReason {
    /// Session has not ended.
    None,
    UpperLimitReached,
    LowerLimitReached,
    ManualEnd,
    Timeout,
}

impl fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEndReason::None => write!(f, "NONE"),
            SessionEndReason::UpperLimitReached => write!(f, "WIN CONDITION - upper limit reached"),
            SessionEndReason::LowerLimitReached => write!(f, "LOSS CONDITION - lower limit reached"),
            SessionEndReason::ManualEnd => write!(f, "manually ended"),
            SessionEndReason::Timeout => write!(f, "session timeout"),
        }
    }
}

/// Which session-level limit stopped a wager. Running out of time ends
/// the session instead, so only the game count lands here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLimit {
    GameCount { max: u32 },
}

impl fmt::Display for SessionLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionLimit::GameCount { max } => write!(f, "maximum of {max} games per session"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session parameters
// ---------------------------------------------------------------------------

fn default_min_bet() -> Decimal {
    dec!(10)
}

fn default_max_bet() -> Decimal {
    dec!(500)
}

fn default_max_games() -> u32 {
    1000
}

/// Longest duration `chrono::Duration` can hold, in whole minutes.
pub const MAX_SESSION_DURATION_MINUTES: u64 = (i64::MAX / 60_000) as u64;

fn default_max_duration_minutes() -> u64 {
    180
}

fn default_win_probability() -> f64 {
    0.5
}

/// Financial boundaries and limits for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionParameters {
    pub initial_stake: Decimal,
    /// Take-profit threshold: reaching it ends the session as a win.
    pub upper_limit: Decimal,
    /// Stop-loss threshold: reaching it ends the session as a loss.
    pub lower_limit: Decimal,
    #[serde(default = "default_min_bet")]
    pub min_bet_amount: Decimal,
    #[serde(default = "default_max_bet")]
    pub max_bet_amount: Decimal,
    #[serde(default = "default_max_games")]
    pub max_games_per_session: u32,
    #[serde(default = "default_max_duration_minutes")]
    pub max_session_duration_minutes: u64,
    #[serde(default = "default_win_probability")]
    pub default_win_probability: f64,
    /// Hard floor of the stake ledger. Transactions that would cross it
    /// are rejected.
    #[serde(default)]
    pub min_stake_boundary: Decimal,
    /// Hard ceiling of the stake ledger. Wins above it are capped.
    #[serde(default)]
    pub max_stake_boundary: Option<Decimal>,
}

impl SessionParameters {
    /// Build parameters with the stock bet and session limits.
    pub fn new(initial_stake: Decimal, upper_limit: Decimal, lower_limit: Decimal) -> Self {
        Self {
            initial_stake,
            upper_limit,
            lower_limit,
            min_bet_amount: default_min_bet(),
            max_bet_amount: default_max_bet(),
            max_games_per_session: default_max_games(),
            max_session_duration_minutes: default_max_duration_minutes(),
            default_win_probability: default_win_probability(),
            min_stake_boundary: Decimal::ZERO,
            max_stake_boundary: None,
        }
    }

    /// Whether the stake is strictly between both limits.
    pub fn is_within_limits(&self, stake: Decimal) -> bool {
        stake > self.lower_limit && stake < self.upper_limit
    }

    pub fn has_reached_upper_limit(&self, stake: Decimal) -> bool {
        stake >= self.upper_limit
    }

    pub fn has_reached_lower_limit(&self, stake: Decimal) -> bool {
        stake <= self.lower_limit
    }

    /// Maximum wall-clock lifetime of the session. Values past
    /// [`MAX_SESSION_DURATION_MINUTES`] saturate there.
    pub fn max_duration(&self) -> chrono::Duration {
        let minutes = self
            .max_session_duration_minutes
            .min(MAX_SESSION_DURATION_MINUTES);
        chrono::Duration::minutes(minutes as i64)
    }

    /// Structural consistency checks. Range thresholds (e.g. maximum
    /// allowed stake) live in `config::ValidationConfig`.
    pub fn validate(&self) -> Result<(), SimError> {
        let fail = |msg: String| Err(SimError::InvalidParameters(msg));

        if self.initial_stake <= Decimal::ZERO {
            return fail(format!("initial stake must be positive, got {}", self.initial_stake));
        }
        if self.lower_limit < Decimal::ZERO {
            return fail(format!("lower limit must not be negative, got {}", self.lower_limit));
        }
        if !self.is_within_limits(self.initial_stake) {
            return fail(format!(
                "initial stake {} must lie strictly between lower limit {} and upper limit {}",
                self.initial_stake, self.lower_limit, self.upper_limit
            ));
        }
        if self.min_bet_amount <= Decimal::ZERO || self.min_bet_amount > self.max_bet_amount {
            return fail(format!(
                "bet range [{}, {}] is invalid",
                self.min_bet_amount, self.max_bet_amount
            ));
        }
        if self.max_games_per_session == 0 {
            return fail("max games per session must be at least 1".to_string());
        }
        if self.max_session_duration_minutes == 0 {
            return fail("max session duration must be at least 1 minute".to_string());
        }
        if self.max_session_duration_minutes > MAX_SESSION_DURATION_MINUTES {
            return fail(format!(
                "max session duration of {} minutes exceeds {MAX_SESSION_DURATION_MINUTES}",
                self.max_session_duration_minutes
            ));
        }
        if !(0.0..=1.0).contains(&self.default_win_probability) {
            return Err(SimError::InvalidProbability(self.default_win_probability));
        }
        if self.min_stake_boundary > self.initial_stake {
            return fail(format!(
                "initial stake {} is below the ledger floor {}",
                self.initial_stake, self.min_stake_boundary
            ));
        }
        if let Some(max) = self.max_stake_boundary {
            if max < self.initial_stake {
                return fail(format!(
                    "initial stake {} is above the ledger ceiling {max}",
                    self.initial_stake
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Game records
// ---------------------------------------------------------------------------

/// One settled wager. Append-only: created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// 1-based position within the session.
    pub sequence: u32,
    pub bet_amount: Decimal,
    pub win_probability: f64,
    pub outcome: GameOutcome,
    /// Amount credited on a win; zero otherwise.
    pub payout: Decimal,
    pub stake_before: Decimal,
    pub stake_after: Decimal,
    pub played_at: DateTime<Utc>,
    /// Time spent settling the wager.
    pub duration_micros: u64,
}

impl GameRecord {
    pub fn won(&self) -> bool {
        self.outcome == GameOutcome::Win
    }

    /// Signed stake movement caused by this wager.
    pub fn net_change(&self) -> Decimal {
        self.stake_after - self.stake_before
    }
}

impl fmt::Display for GameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Game #{}: {} ${:.2} @ {:.1}% | Stake: ${:.2} -> ${:.2} ({}µs)",
            self.sequence,
            self.outcome,
            self.bet_amount,
            self.win_probability * 100.0,
            self.stake_before,
            self.stake_after,
            self.duration_micros,
        )
    }
}

/// A pause window. Open while `resumed_at` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauseInterval {
    pub paused_at: DateTime<Utc>,
    pub resumed_at: Option<DateTime<Utc>>,
    pub reason: String,
}

impl PauseInterval {
    pub fn open(paused_at: DateTime<Utc>, reason: &str) -> Self {
        Self {
            paused_at,
            resumed_at: None,
            reason: reason.to_string(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.resumed_at.is_none()
    }

    /// Length of the pause; an open pause is measured up to `now`.
    pub fn duration(&self, now: DateTime<Utc>) -> chrono::Duration {
        self.resumed_at.unwrap_or(now) - self.paused_at
    }
}

impl fmt::Display for PauseInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.resumed_at {
            Some(resumed) => write!(
                f,
                "Paused: {} | Resumed: {} | Duration: {}s | Reason: {}",
                self.paused_at.format("%H:%M:%S"),
                resumed.format("%H:%M:%S"),
                (resumed - self.paused_at).num_seconds(),
                self.reason,
            ),
            None => write!(
                f,
                "Paused: {} | Still paused | Reason: {}",
                self.paused_at.format("%H:%M:%S"),
                self.reason,
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Stake transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    InitialStake,
    BetWin,
    BetLoss,
    Deposit,
    Withdrawal,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::InitialStake => write!(f, "INITIAL_STAKE"),
            TransactionType::BetWin => write!(f, "BET_WIN"),
            TransactionType::BetLoss => write!(f, "BET_LOSS"),
            TransactionType::Deposit => write!(f, "DEPOSIT"),
            TransactionType::Withdrawal => write!(f, "WITHDRAWAL"),
        }
    }
}

/// Audit entry for one committed ledger movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeTransaction {
    pub id: Uuid,
    pub kind: TransactionType,
    pub amount: Decimal,
    pub previous_balance: Decimal,
    pub new_balance: Decimal,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

impl fmt::Display for StakeTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: ${:.2} (Balance: ${:.2} -> ${:.2}) - {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.kind,
            self.amount,
            self.previous_balance,
            self.new_balance,
            self.description,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain errors raised by the session core.
///
/// A session ending on a boundary or timeout is *not* an error; those are
/// reported through return values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error("Invalid transition: cannot {action} a session that is {from}")]
    InvalidTransition {
        from: SessionStatus,
        action: &'static str,
    },

    #[error("Bet amount ${amount:.2} outside allowed range [${min:.2}, ${max:.2}]")]
    BetOutOfRange {
        amount: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("Insufficient stake: need ${needed:.2}, have ${available:.2}")]
    InsufficientStake { needed: Decimal, available: Decimal },

    #[error("Boundary violation: balance ${attempted:.2} would breach boundary ${boundary:.2}")]
    BoundaryViolation { attempted: Decimal, boundary: Decimal },

    #[error("Session limit reached: {0}")]
    SessionLimitReached(SessionLimit),

    #[error("Invalid probability: {0}")]
    InvalidProbability(f64),

    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
