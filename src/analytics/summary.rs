//! End-of-session summary.
//!
//! Computable at any time; `authoritative` is only true once the session
//! has reached a terminal status.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use super::statistics::StatisticsAggregator;
use crate::engine::session::Session;
use crate::types::{SessionEndReason, SessionStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub gambler_id: String,
    pub status: SessionStatus,
    pub end_reason: SessionEndReason,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub total_seconds: i64,
    pub active_seconds: i64,
    pub paused_seconds: i64,
    pub pause_count: usize,
    pub initial_stake: Decimal,
    pub final_stake: Decimal,
    pub net_profit: Decimal,
    /// Net profit as a percentage of the initial stake.
    pub return_pct: Decimal,
    pub total_wagered: Decimal,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
    pub average_bet: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub longest_win_streak: u32,
    pub longest_loss_streak: u32,
    pub peak_stake: Decimal,
    pub lowest_stake: Decimal,
    pub volatility: Decimal,
    pub authoritative: bool,
}

impl SessionSummary {
    pub fn from_session(session: &Session, now: DateTime<Utc>) -> Self {
        let stats = StatisticsAggregator::aggregate(&session.records);
        let ledger = &session.ledger;

        let total = session.elapsed(now);
        let paused = session.paused_duration(now);
        let initial = ledger.initial_stake();
        let net = ledger.current_stake() - initial;

        Self {
            session_id: session.id.clone(),
            gambler_id: session.gambler_id.clone(),
            status: session.status,
            end_reason: session.end_reason,
            started_at: session.started_at,
            ended_at: session.ended_at,
            total_seconds: total.num_seconds(),
            active_seconds: (total - paused).num_seconds().max(0),
            paused_seconds: paused.num_seconds(),
            pause_count: session.pauses.len(),
            initial_stake: initial,
            final_stake: ledger.current_stake(),
            net_profit: net,
            return_pct: return_pct(net, initial),
            total_wagered: stats.total_wagered,
            games_played: session.games_played,
            wins: session.wins,
            losses: session.losses,
            win_rate: stats.win_rate,
            average_bet: stats.average_bet,
            largest_win: stats.largest_win,
            largest_loss: stats.largest_loss,
            longest_win_streak: stats.longest_win_streak,
            longest_loss_streak: stats.longest_loss_streak,
            peak_stake: ledger.peak_stake(),
            lowest_stake: ledger.lowest_stake(),
            volatility: ledger.volatility(),
            authoritative: session.status.is_terminal(),
        }
    }
}

/// `net / initial` as a percentage. Only a gain can overflow, so an
/// overflow saturates upward.
fn return_pct(net: Decimal, initial: Decimal) -> Decimal {
    net.checked_div(initial)
        .map(|ratio| ratio.saturating_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::MAX)
}

fn hms(seconds: i64) -> String {
    format!("{:02}:{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60, seconds % 60)
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Session {} ({}) ===", self.session_id, self.gambler_id)?;
        writeln!(f, "Status: {} | Reason: {}", self.status, self.end_reason)?;
        if !self.authoritative {
            writeln!(f, "(provisional: session still open)")?;
        }
        writeln!(
            f,
            "Duration: {} (active {}, paused {} over {} pauses)",
            hms(self.total_seconds),
            hms(self.active_seconds),
            hms(self.paused_seconds),
            self.pause_count
        )?;
        writeln!(
            f,
            "Stake: ${:.2} -> ${:.2} | Net: ${:.2} ({:.2}%)",
            self.initial_stake, self.final_stake, self.net_profit, self.return_pct
        )?;
        writeln!(
            f,
            "Peak: ${:.2} | Lowest: ${:.2} | Volatility: ${:.2}",
            self.peak_stake, self.lowest_stake, self.volatility
        )?;
        writeln!(
            f,
            "Games: {} ({}W / {}L) | Win rate: {:.1}% | Wagered: ${:.2} | Avg bet: ${:.2}",
            self.games_played,
            self.wins,
            self.losses,
            self.win_rate * 100.0,
            self.total_wagered,
            self.average_bet
        )?;
        write!(
            f,
            "Largest win: ${:.2} | Largest loss: ${:.2} | Longest streaks: {}W / {}L",
            self.largest_win, self.largest_loss, self.longest_win_streak, self.longest_loss_streak
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clock::{Clock, ManualClock};
    use crate::engine::odds::{OddsConfiguration, OddsModel};
    use crate::engine::outcome::MockOutcomeSource;
    use crate::engine::session::GamingSession;
    use crate::engine::settlement::WagerSettlementEngine;
    use crate::strategy::StrategyConfig;
    use crate::types::SessionParameters;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn always_winning(clock: Arc<ManualClock>) -> GamingSession {
        let mut source = MockOutcomeSource::new();
        source.expect_decide().returning(|_| true);
        source.expect_name().returning(|| "mock".to_string());
        let engine = WagerSettlementEngine::new(
            OddsModel::new(OddsConfiguration::default()).unwrap(),
            Box::new(source),
        );
        GamingSession::new(
            "gambler-7",
            SessionParameters::new(dec!(500), dec!(700), dec!(200)),
            engine,
            StrategyConfig::Fixed { amount: dec!(50) }.build().unwrap(),
            clock,
        )
        .unwrap()
    }

    #[test]
    fn test_hms() {
        assert_eq!(hms(0), "00:00:00");
        assert_eq!(hms(3725), "01:02:05");
    }

    #[test]
    fn test_return_pct_saturates() {
        assert_eq!(return_pct(dec!(100), dec!(500)), dec!(20));
        assert_eq!(return_pct(dec!(-500), dec!(500)), dec!(-100));
        assert_eq!(return_pct(Decimal::MAX, dec!(0.0001)), Decimal::MAX);
    }

    #[test]
    fn test_provisional_summary_of_open_session() {
        let clock = Arc::new(ManualClock::starting_now());
        let mut s = always_winning(clock.clone());
        s.start().unwrap();
        s.play_game(dec!(50), 0.5).unwrap();
        clock.advance(Duration::seconds(30));
        s.pause("break").unwrap();
        clock.advance(Duration::seconds(20));
        s.resume().unwrap();
        s.play_game(dec!(50), 0.5).unwrap();
        clock.advance(Duration::seconds(10));

        let summary = SessionSummary::from_session(s.session(), clock.now());
        assert!(!summary.authoritative);
        assert_eq!(summary.status, SessionStatus::Active);
        assert_eq!(summary.end_reason, SessionEndReason::None);
        assert_eq!(summary.ended_at, None);
        assert_eq!(summary.total_seconds, 60);
        assert_eq!(summary.paused_seconds, 20);
        assert_eq!(summary.active_seconds, 40);
        assert_eq!(summary.pause_count, 1);
        assert_eq!(summary.final_stake, dec!(600));
        assert_eq!(summary.net_profit, dec!(100));
        assert_eq!(summary.return_pct, dec!(20));
        assert_eq!(summary.wins, 2);
        assert_eq!(summary.longest_win_streak, 2);

        let text = format!("{summary}");
        assert!(text.contains("(provisional: session still open)"));
        assert!(text.contains("Net: $100.00 (20.00%)"));
        assert!(text.contains("active 00:00:40, paused 00:00:20 over 1 pauses"));
    }

    #[test]
    fn test_ended_summary_is_authoritative_and_frozen() {
        let clock = Arc::new(ManualClock::starting_now());
        let mut s = always_winning(clock.clone());
        s.start().unwrap();
        s.play_game(dec!(50), 0.5).unwrap();
        clock.advance(Duration::seconds(15));
        s.end_manually().unwrap();
        clock.advance(Duration::hours(2));

        let summary = SessionSummary::from_session(s.session(), clock.now());
        assert!(summary.authoritative);
        assert_eq!(summary.status, SessionStatus::EndedManual);
        assert_eq!(summary.total_seconds, 15);
        assert!(!format!("{summary}").contains("provisional"));
    }
}
