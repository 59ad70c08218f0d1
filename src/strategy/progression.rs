//! Progression systems: Martingale, Reverse Martingale and D'Alembert.
//!
//! Each keeps one number of state and moves it based on the most recent
//! settled wager only. A push leaves the state where it was.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{GameOutcome, GameRecord};

// ---------------------------------------------------------------------------
// Martingale
// ---------------------------------------------------------------------------

/// Double after a loss, back to base after a win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Martingale {
    pub base: Decimal,
    pub next: Decimal,
}

impl Martingale {
    pub fn new(base: Decimal) -> Self {
        Self { base, next: base }
    }

    pub fn propose(&self, _stake: Decimal) -> Decimal {
        self.next
    }

    pub fn observe(&mut self, last: &GameRecord) {
        match last.outcome {
            GameOutcome::Loss => self.next = last.bet_amount * Decimal::TWO,
            GameOutcome::Win => self.next = self.base,
            GameOutcome::Push => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Reverse Martingale
// ---------------------------------------------------------------------------

/// Double after a win, back to base after a loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseMartingale {
    pub base: Decimal,
    pub next: Decimal,
}

impl ReverseMartingale {
    pub fn new(base: Decimal) -> Self {
        Self { base, next: base }
    }

    pub fn propose(&self, _stake: Decimal) -> Decimal {
        self.next
    }

    pub fn observe(&mut self, last: &GameRecord) {
        match last.outcome {
            GameOutcome::Win => self.next = last.bet_amount * Decimal::TWO,
            GameOutcome::Loss => self.next = self.base,
            GameOutcome::Push => {}
        }
    }
}

// ---------------------------------------------------------------------------
// D'Alembert
// ---------------------------------------------------------------------------

/// Climb one increment after a loss, step down one after a win, never
/// below base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DAlembert {
    pub base: Decimal,
    pub increment: Decimal,
    pub current: Decimal,
}

impl DAlembert {
    pub fn new(base: Decimal, increment: Decimal) -> Self {
        Self {
            base,
            increment,
            current: base,
        }
    }

    pub fn propose(&self, _stake: Decimal) -> Decimal {
        self.current
    }

    pub fn observe(&mut self, last: &GameRecord) {
        match last.outcome {
            GameOutcome::Loss => self.current += self.increment,
            GameOutcome::Win => self.current = self.base.max(self.current - self.increment),
            GameOutcome::Push => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn record(bet: Decimal, outcome: GameOutcome) -> GameRecord {
        GameRecord {
            sequence: 1,
            bet_amount: bet,
            win_probability: 0.5,
            outcome,
            payout: Decimal::ZERO,
            stake_before: dec!(1000),
            stake_after: dec!(1000),
            played_at: Utc::now(),
            duration_micros: 0,
        }
    }

    #[test]
    fn test_martingale_doubles_last_bet() {
        let mut m = Martingale::new(dec!(10));
        m.observe(&record(dec!(25), GameOutcome::Loss));
        assert_eq!(m.propose(dec!(1000)), dec!(50));
        m.observe(&record(dec!(50), GameOutcome::Win));
        assert_eq!(m.propose(dec!(1000)), dec!(10));
    }

    #[test]
    fn test_reverse_martingale() {
        let mut m = ReverseMartingale::new(dec!(10));
        m.observe(&record(dec!(10), GameOutcome::Win));
        assert_eq!(m.propose(dec!(1000)), dec!(20));
        m.observe(&record(dec!(20), GameOutcome::Win));
        assert_eq!(m.propose(dec!(1000)), dec!(40));
        m.observe(&record(dec!(40), GameOutcome::Loss));
        assert_eq!(m.propose(dec!(1000)), dec!(10));
    }

    #[test]
    fn test_dalembert_floor_at_base() {
        let mut d = DAlembert::new(dec!(10), dec!(5));
        d.observe(&record(dec!(10), GameOutcome::Win));
        assert_eq!(d.propose(dec!(1000)), dec!(10));
    }

    #[test]
    fn test_push_keeps_state() {
        let mut d = DAlembert::new(dec!(10), dec!(5));
        d.observe(&record(dec!(10), GameOutcome::Loss));
        d.observe(&record(dec!(15), GameOutcome::Push));
        assert_eq!(d.propose(dec!(1000)), dec!(15));

        let mut m = Martingale::new(dec!(10));
        m.observe(&record(dec!(10), GameOutcome::Loss));
        m.observe(&record(dec!(20), GameOutcome::Push));
        assert_eq!(m.propose(dec!(1000)), dec!(20));
    }
}
