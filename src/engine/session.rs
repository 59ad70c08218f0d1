//! Session lifecycle: the state machine around a single gambler's session.
//!
//! `Initialized → Active ⇄ Paused → Ended*`. All mutation of a `Session`
//! goes through `GamingSession`; the `Ended*` states are terminal.
//!
//! Boundary and timeout endings are ordinary return values (`PlayResult`,
//! the status returned by `resume`), never errors.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::clock::Clock;
use super::ledger::{StakeLedger, StakeLedgerView};
use super::odds::check_probability;
use super::settlement::{validate_wager, Wager, WagerSettlementEngine};
use crate::analytics::statistics::{StatisticsAggregator, StatisticsSnapshot};
use crate::analytics::summary::SessionSummary;
use crate::strategy::BetSizer;
use crate::types::{
    GameRecord, PauseInterval, SessionEndReason, SessionLimit, SessionParameters, SessionStatus,
    SimError,
};

// ---------------------------------------------------------------------------
// Session data
// ---------------------------------------------------------------------------

/// Plain, serialisable session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub gambler_id: String,
    pub parameters: SessionParameters,
    pub status: SessionStatus,
    pub end_reason: SessionEndReason,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub last_activity_at: DateTime<Utc>,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub records: Vec<GameRecord>,
    pub pauses: Vec<PauseInterval>,
    /// Accumulated length of closed pauses.
    pub paused_millis: i64,
    pub ledger: StakeLedger,
    pub sizer: BetSizer,
}

impl Session {
    pub fn current_stake(&self) -> Decimal {
        self.ledger.current_stake()
    }

    pub fn open_pause(&self) -> Option<&PauseInterval> {
        self.pauses.iter().rev().find(|p| p.is_open())
    }

    /// Wall-clock time since start, pauses included. Frozen once ended.
    pub fn elapsed(&self, now: DateTime<Utc>) -> chrono::Duration {
        match self.started_at {
            Some(start) => self.ended_at.unwrap_or(now) - start,
            None => chrono::Duration::zero(),
        }
    }

    /// Closed pauses plus any pause still open at `now`.
    pub fn paused_duration(&self, now: DateTime<Utc>) -> chrono::Duration {
        let open = self
            .open_pause()
            .map(|p| p.duration(self.ended_at.unwrap_or(now)))
            .unwrap_or_else(chrono::Duration::zero);
        chrono::Duration::milliseconds(self.paused_millis) + open
    }

    pub fn total_pause_duration_seconds(&self) -> i64 {
        self.paused_millis / 1000
    }

    pub fn has_timed_out(&self, now: DateTime<Utc>) -> bool {
        self.elapsed(now) >= self.parameters.max_duration()
    }
}

// ---------------------------------------------------------------------------
// Play result
// ---------------------------------------------------------------------------

/// Outcome of a play call that did not fail.
#[derive(Debug, Clone)]
pub enum PlayResult {
    /// The wager settled; `status` is the session status afterwards, which
    /// is terminal if a limit was reached.
    Settled {
        record: GameRecord,
        status: SessionStatus,
    },
    /// The session had run out of time; no wager was placed.
    TimedOut { summary: SessionSummary },
}

impl PlayResult {
    pub fn record(&self) -> Option<&GameRecord> {
        match self {
            PlayResult::Settled { record, .. } => Some(record),
            PlayResult::TimedOut { .. } => None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self {
            PlayResult::Settled { status, .. } => *status,
            PlayResult::TimedOut { summary } => summary.status,
        }
    }

    pub fn ended_session(&self) -> bool {
        self.status().is_terminal()
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

pub struct GamingSession {
    session: Session,
    engine: WagerSettlementEngine,
    clock: Arc<dyn Clock>,
}

impl GamingSession {
    pub fn new(
        gambler_id: &str,
        parameters: SessionParameters,
        engine: WagerSettlementEngine,
        sizer: BetSizer,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SimError> {
        parameters.validate()?;

        let now = clock.now();
        let ledger = StakeLedger::new(
            parameters.initial_stake,
            parameters.min_stake_boundary,
            parameters.max_stake_boundary,
            now,
        )?;
        let id = format!(
            "SESSION-{}",
            Uuid::new_v4().simple().to_string()[..8].to_uppercase()
        );

        info!(
            session_id = %id,
            gambler_id,
            initial_stake = format!("${:.2}", parameters.initial_stake),
            lower_limit = format!("${:.2}", parameters.lower_limit),
            upper_limit = format!("${:.2}", parameters.upper_limit),
            strategy = %sizer.strategy(),
            outcomes = %engine.outcome_source_name(),
            "Session created"
        );

        Ok(Self {
            session: Session {
                id,
                gambler_id: gambler_id.to_string(),
                parameters,
                status: SessionStatus::Initialized,
                end_reason: SessionEndReason::None,
                created_at: now,
                started_at: None,
                ended_at: None,
                last_activity_at: now,
                games_played: 0,
                wins: 0,
                losses: 0,
                records: Vec::new(),
                pauses: Vec::new(),
                paused_millis: 0,
                ledger,
                sizer,
            },
            engine,
            clock,
        })
    }

    /// Rebuild a live session around previously saved data.
    pub fn restore(session: Session, engine: WagerSettlementEngine, clock: Arc<dyn Clock>) -> Self {
        info!(
            session_id = %session.id,
            status = %session.status,
            games = session.games_played,
            "Session restored"
        );
        Self {
            session,
            engine,
            clock,
        }
    }

    // -- Transitions --------------------------------------------------------

    pub fn start(&mut self) -> Result<(), SimError> {
        self.require(SessionStatus::Initialized, "start")?;
        let now = self.clock.now();
        self.session.started_at = Some(now);
        self.transition(SessionStatus::Active, now);
        Ok(())
    }

    pub fn pause(&mut self, reason: &str) -> Result<(), SimError> {
        self.require(SessionStatus::Active, "pause")?;
        let now = self.clock.now();
        self.session.pauses.push(PauseInterval::open(now, reason));
        self.transition(SessionStatus::Paused, now);
        Ok(())
    }

    /// Reactivate a paused session. Returns `EndedTimeout` instead if the
    /// session ran out of time while paused.
    pub fn resume(&mut self) -> Result<SessionStatus, SimError> {
        self.require(SessionStatus::Paused, "resume")?;
        let now = self.clock.now();
        self.close_open_pause(now);

        if self.session.has_timed_out(now) {
            self.finish(SessionStatus::EndedTimeout, SessionEndReason::Timeout, now);
            return Ok(SessionStatus::EndedTimeout);
        }

        self.transition(SessionStatus::Active, now);
        Ok(SessionStatus::Active)
    }

    /// End the session by hand. Ending an already-ended session is a no-op.
    pub fn end_manually(&mut self) -> Result<SessionSummary, SimError> {
        match self.session.status {
            SessionStatus::Active | SessionStatus::Paused => {
                let now = self.clock.now();
                Ok(self.finish(SessionStatus::EndedManual, SessionEndReason::ManualEnd, now))
            }
            status if status.is_terminal() => {
                debug!(session_id = %self.session.id, %status, "Session already ended");
                Ok(self.summary())
            }
            from => Err(SimError::InvalidTransition {
                from,
                action: "end",
            }),
        }
    }

    // -- Play ---------------------------------------------------------------

    /// Settle one wager of `bet_amount` at `win_probability`.
    pub fn play_game(
        &mut self,
        bet_amount: Decimal,
        win_probability: f64,
    ) -> Result<PlayResult, SimError> {
        self.require(SessionStatus::Active, "play")?;

        let now = self.clock.now();
        if self.session.has_timed_out(now) {
            let summary = self.finish(SessionStatus::EndedTimeout, SessionEndReason::Timeout, now);
            return Ok(PlayResult::TimedOut { summary });
        }

        let params = &self.session.parameters;
        if self.session.games_played >= params.max_games_per_session {
            return Err(SimError::SessionLimitReached(SessionLimit::GameCount {
                max: params.max_games_per_session,
            }));
        }
        check_probability(win_probability)?;
        validate_wager(params, self.session.current_stake(), bet_amount)?;

        let wager = Wager {
            sequence: self.session.games_played + 1,
            amount: bet_amount,
            win_probability,
        };
        let settlement = self.engine.settle(&mut self.session.ledger, &wager, now)?;
        let record = settlement.record;

        self.session.games_played += 1;
        if record.won() {
            self.session.wins += 1;
        } else {
            self.session.losses += 1;
        }
        self.session.last_activity_at = now;
        self.session.records.push(record.clone());

        let stake = self.session.current_stake();
        let params = &self.session.parameters;
        if params.has_reached_upper_limit(stake) {
            self.finish(SessionStatus::EndedWin, SessionEndReason::UpperLimitReached, now);
        } else if params.has_reached_lower_limit(stake) {
            self.finish(SessionStatus::EndedLoss, SessionEndReason::LowerLimitReached, now);
        }

        Ok(PlayResult::Settled {
            record,
            status: self.session.status,
        })
    }

    /// Let the session's strategy choose the amount.
    pub fn play_with_strategy(&mut self, win_probability: f64) -> Result<PlayResult, SimError> {
        self.require(SessionStatus::Active, "play")?;
        let amount = self.propose_bet();
        self.play_game(amount, win_probability)
    }

    /// Strategy-sized wager at the configured default probability.
    pub fn play_default(&mut self) -> Result<PlayResult, SimError> {
        let p = self.session.parameters.default_win_probability;
        self.play_with_strategy(p)
    }

    /// Amount the strategy would bet next, clamped to the bet range and
    /// the current stake.
    pub fn propose_bet(&mut self) -> Decimal {
        let s = &mut self.session;
        s.sizer.next(
            s.ledger.current_stake(),
            s.parameters.min_bet_amount,
            s.parameters.max_bet_amount,
            &s.records,
        )
    }

    // -- Views --------------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.session.id
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.session.elapsed(self.clock.now())
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary::from_session(&self.session, self.clock.now())
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        StatisticsAggregator::aggregate(&self.session.records)
    }

    pub fn ledger_view(&self) -> StakeLedgerView {
        self.session.ledger.view()
    }

    // -- Internals ----------------------------------------------------------

    fn require(&self, expected: SessionStatus, action: &'static str) -> Result<(), SimError> {
        if self.session.status == expected {
            Ok(())
        } else {
            warn!(
                session_id = %self.session.id,
                status = %self.session.status,
                action,
                "Rejected state transition"
            );
            Err(SimError::InvalidTransition {
                from: self.session.status,
                action,
            })
        }
    }

    fn transition(&mut self, to: SessionStatus, now: DateTime<Utc>) {
        let from = self.session.status;
        self.session.status = to;
        self.session.last_activity_at = now;
        info!(session_id = %self.session.id, %from, %to, "Session state changed");
    }

    fn close_open_pause(&mut self, now: DateTime<Utc>) {
        if let Some(pause) = self.session.pauses.iter_mut().rev().find(|p| p.is_open()) {
            pause.resumed_at = Some(now);
            let length = pause.duration(now);
            self.session.paused_millis += length.num_milliseconds();
            debug!(
                session_id = %self.session.id,
                paused_secs = length.num_seconds(),
                "Pause closed"
            );
        }
    }

    fn finish(
        &mut self,
        status: SessionStatus,
        reason: SessionEndReason,
        now: DateTime<Utc>,
    ) -> SessionSummary {
        self.close_open_pause(now);
        self.session.end_reason = reason;
        self.session.ended_at = Some(now);
        self.transition(status, now);

        let summary = SessionSummary::from_session(&self.session, now);
        info!(
            session_id = %self.session.id,
            reason = %reason,
            games = summary.games_played,
            final_stake = format!("${:.2}", summary.final_stake),
            net_profit = format!("${:.2}", summary.net_profit),
            "Session ended"
        );
        summary
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
