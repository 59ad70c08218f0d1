//! Win/loss statistics over a game history.
//!
//! `StatisticsAggregator::aggregate` is a pure function of the records it is
//! given, so it can be called at any point of a session (or on a restored
//! snapshot) and always agrees with the history.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::types::{GameOutcome, GameRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub total_games: u32,
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    /// Sum of payouts credited on winning games.
    pub total_winnings: Decimal,
    /// Sum of bets lost.
    pub total_losses: Decimal,
    pub net_profit: Decimal,
    pub total_wagered: Decimal,
    pub win_rate: f64,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub average_bet: Decimal,
    /// `total_winnings / total_losses`; infinite with winnings and no losses.
    pub profit_factor: f64,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub current_win_streak: u32,
    pub current_loss_streak: u32,
    pub longest_win_streak: u32,
    pub longest_loss_streak: u32,
}

impl StatisticsSnapshot {
    /// Wins per loss. Infinite when there are wins and no losses.
    pub fn win_loss_ratio(&self) -> f64 {
        match (self.wins, self.losses) {
            (0, 0) => 0.0,
            (_, 0) => f64::INFINITY,
            (w, l) => w as f64 / l as f64,
        }
    }

    /// Net profit per unit lost; zero when nothing was lost.
    pub fn return_on_risk(&self) -> f64 {
        if self.total_losses.is_zero() {
            return 0.0;
        }
        (self.net_profit / self.total_losses).to_f64().unwrap_or(0.0)
    }
}

impl fmt::Display for StatisticsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let profit_factor = if self.profit_factor.is_infinite() {
            "inf".to_string()
        } else {
            format!("{:.2}", self.profit_factor)
        };
        writeln!(f, "Games: {} ({}W / {}L / {}P)", self.total_games, self.wins, self.losses, self.pushes)?;
        writeln!(f, "Win rate: {:.1}%", self.win_rate * 100.0)?;
        writeln!(
            f,
            "Winnings: ${:.2} | Losses: ${:.2} | Net: ${:.2}",
            self.total_winnings, self.total_losses, self.net_profit
        )?;
        writeln!(
            f,
            "Avg win: ${:.2} | Avg loss: ${:.2} | Profit factor: {}",
            self.average_win, self.average_loss, profit_factor
        )?;
        writeln!(
            f,
            "Largest win: ${:.2} | Largest loss: ${:.2}",
            self.largest_win, self.largest_loss
        )?;
        write!(
            f,
            "Streaks: current {}W/{}L, longest {}W/{}L",
            self.current_win_streak,
            self.current_loss_streak,
            self.longest_win_streak,
            self.longest_loss_streak
        )
    }
}

pub struct StatisticsAggregator;

impl StatisticsAggregator {
    pub fn aggregate(records: &[GameRecord]) -> StatisticsSnapshot {
        let mut s = StatisticsSnapshot {
            total_games: records.len() as u32,
            wins: 0,
            losses: 0,
            pushes: 0,
            total_winnings: Decimal::ZERO,
            total_losses: Decimal::ZERO,
            net_profit: Decimal::ZERO,
            total_wagered: Decimal::ZERO,
            win_rate: 0.0,
            average_win: Decimal::ZERO,
            average_loss: Decimal::ZERO,
            average_bet: Decimal::ZERO,
            profit_factor: 0.0,
            largest_win: Decimal::ZERO,
            largest_loss: Decimal::ZERO,
            current_win_streak: 0,
            current_loss_streak: 0,
            longest_win_streak: 0,
            longest_loss_streak: 0,
        };

        for record in records {
            s.total_wagered += record.bet_amount;
            match record.outcome {
                GameOutcome::Win => {
                    s.wins += 1;
                    s.total_winnings += record.payout;
                    s.largest_win = s.largest_win.max(record.payout);
                    s.current_win_streak += 1;
                    s.current_loss_streak = 0;
                    s.longest_win_streak = s.longest_win_streak.max(s.current_win_streak);
                }
                GameOutcome::Loss => {
                    s.losses += 1;
                    s.total_losses += record.bet_amount;
                    s.largest_loss = s.largest_loss.max(record.bet_amount);
                    s.current_loss_streak += 1;
                    s.current_win_streak = 0;
                    s.longest_loss_streak = s.longest_loss_streak.max(s.current_loss_streak);
                }
                GameOutcome::Push => {
                    s.pushes += 1;
                    s.current_win_streak = 0;
                    s.current_loss_streak = 0;
                }
            }
        }

        s.net_profit = s.total_winnings - s.total_losses;
        if s.total_games > 0 {
            s.win_rate = s.wins as f64 / s.total_games as f64;
            s.average_bet = s.total_wagered / Decimal::from(s.total_games);
        }
        if s.wins > 0 {
            s.average_win = s.total_winnings / Decimal::from(s.wins);
        }
        if s.losses > 0 {
            s.average_loss = s.total_losses / Decimal::from(s.losses);
        }
        s.profit_factor = profit_factor(s.total_winnings, s.total_losses);

        s
    }
}

fn profit_factor(winnings: Decimal, losses: Decimal) -> f64 {
    if losses > Decimal::ZERO {
        (winnings / losses).to_f64().unwrap_or(0.0)
    } else if winnings > Decimal::ZERO {
        f64::INFINITY
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
