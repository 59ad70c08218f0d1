//! Session registry: the id-keyed surface callers drive.
//!
//! Owns every live `GamingSession`. Sessions never share state; the manager
//! only routes calls by id and runs batch auto-play.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::clock::Clock;
use super::ledger::StakeLedgerView;
use super::odds::OddsModel;
use super::outcome::OutcomeSource;
use super::session::{GamingSession, PlayResult, Session};
use super::settlement::WagerSettlementEngine;
use crate::analytics::{SessionSummary, StatisticsSnapshot};
use crate::strategy::BetSizer;
use crate::types::{GameRecord, SessionParameters, SessionStatus, SimError};

/// Identifies a created session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: String,
    pub gambler_id: String,
}

/// Why a batch stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchStop {
    /// Every requested game was played.
    Completed,
    /// The session reached a terminal status.
    SessionEnded(SessionStatus),
    /// A wager could not be placed.
    Rejected(SimError),
    /// The caller cancelled auto-play.
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub requested: u32,
    pub records: Vec<GameRecord>,
    pub stop: BatchStop,
}

impl BatchReport {
    pub fn played(&self) -> usize {
        self.records.len()
    }
}

pub struct SessionManager {
    sessions: HashMap<String, GamingSession>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: HashMap::new(),
            clock,
        }
    }

    pub fn create_session(
        &mut self,
        gambler_id: &str,
        parameters: SessionParameters,
        sizer: BetSizer,
        odds: OddsModel,
        outcomes: Box<dyn OutcomeSource>,
    ) -> Result<SessionHandle, SimError> {
        let engine = WagerSettlementEngine::new(odds, outcomes);
        let session =
            GamingSession::new(gambler_id, parameters, engine, sizer, self.clock.clone())?;
        let handle = SessionHandle {
            id: session.id().to_string(),
            gambler_id: gambler_id.to_string(),
        };
        self.sessions.insert(handle.id.clone(), session);
        Ok(handle)
    }

    /// Register a session rebuilt from a snapshot.
    pub fn restore_session(
        &mut self,
        session: Session,
        odds: OddsModel,
        outcomes: Box<dyn OutcomeSource>,
    ) -> SessionHandle {
        let handle = SessionHandle {
            id: session.id.clone(),
            gambler_id: session.gambler_id.clone(),
        };
        let engine = WagerSettlementEngine::new(odds, outcomes);
        self.sessions.insert(
            handle.id.clone(),
            GamingSession::restore(session, engine, self.clock.clone()),
        );
        handle
    }

    pub fn get(&self, id: &str) -> Result<&GamingSession, SimError> {
        self.sessions
            .get(id)
            .ok_or_else(|| SimError::SessionNotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut GamingSession, SimError> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| SimError::SessionNotFound(id.to_string()))
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    // -- Lifecycle ----------------------------------------------------------

    pub fn start(&mut self, id: &str) -> Result<(), SimError> {
        self.get_mut(id)?.start()
    }

    pub fn pause(&mut self, id: &str, reason: &str) -> Result<(), SimError> {
        self.get_mut(id)?.pause(reason)
    }

    pub fn resume(&mut self, id: &str) -> Result<SessionStatus, SimError> {
        self.get_mut(id)?.resume()
    }

    pub fn end_manually(&mut self, id: &str) -> Result<SessionSummary, SimError> {
        self.get_mut(id)?.end_manually()
    }

    /// Drop a session from the registry, returning its final data.
    pub fn remove_session(&mut self, id: &str) -> Result<Session, SimError> {
        let session = self
            .sessions
            .remove(id)
            .ok_or_else(|| SimError::SessionNotFound(id.to_string()))?;
        info!(session_id = id, status = %session.status(), "Session archived");
        Ok(session.into_session())
    }

    // -- Play ---------------------------------------------------------------

    pub fn play_game(
        &mut self,
        id: &str,
        bet_amount: Decimal,
        win_probability: f64,
    ) -> Result<PlayResult, SimError> {
        self.get_mut(id)?.play_game(bet_amount, win_probability)
    }

    pub fn play_with_strategy(
        &mut self,
        id: &str,
        win_probability: f64,
    ) -> Result<PlayResult, SimError> {
        self.get_mut(id)?.play_with_strategy(win_probability)
    }

    pub fn play_default(&mut self, id: &str) -> Result<PlayResult, SimError> {
        self.get_mut(id)?.play_default()
    }

    /// Play up to `games` strategy-sized wagers, stopping at the first
    /// wager that ends the session or cannot be placed.
    pub fn play_batch(
        &mut self,
        id: &str,
        games: u32,
        win_probability: f64,
    ) -> Result<BatchReport, SimError> {
        let session = self.get_mut(id)?;
        let mut records = Vec::new();
        let mut stop = BatchStop::Completed;

        for _ in 0..games {
            match session.play_with_strategy(win_probability) {
                Ok(PlayResult::Settled { record, status }) => {
                    records.push(record);
                    if status.is_terminal() {
                        stop = BatchStop::SessionEnded(status);
                        break;
                    }
                }
                Ok(PlayResult::TimedOut { summary }) => {
                    stop = BatchStop::SessionEnded(summary.status);
                    break;
                }
                Err(e) => {
                    warn!(session_id = id, error = %e, "Batch stopped: wager rejected");
                    stop = BatchStop::Rejected(e);
                    break;
                }
            }
        }

        info!(
            session_id = id,
            requested = games,
            played = records.len(),
            stop = ?stop,
            "Batch finished"
        );

        Ok(BatchReport {
            requested: games,
            records,
            stop,
        })
    }

    // -- Views --------------------------------------------------------------

    pub fn get_statistics(&self, id: &str) -> Result<StatisticsSnapshot, SimError> {
        Ok(self.get(id)?.statistics())
    }

    pub fn get_stake_ledger_view(&self, id: &str) -> Result<StakeLedgerView, SimError> {
        Ok(self.get(id)?.ledger_view())
    }

    pub fn get_summary(&self, id: &str) -> Result<SessionSummary, SimError> {
        Ok(self.get(id)?.summary())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
