//! Fibonacci progression.
//!
//! Walks a fixed Fibonacci table: one step forward after a loss, two steps
//! back after a win. The bet is `base × SEQUENCE[position]`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{GameOutcome, GameRecord};

pub const SEQUENCE: [u64; 20] = [
    1, 1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144, 233, 377, 610, 987, 1597, 2584, 4181, 6765,
];

const LAST_POSITION: usize = SEQUENCE.len() - 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fibonacci {
    pub base: Decimal,
    pub position: usize,
}

impl Fibonacci {
    pub fn new(base: Decimal) -> Self {
        Self { base, position: 0 }
    }

    pub fn propose(&self, _stake: Decimal) -> Decimal {
        self.base * Decimal::from(SEQUENCE[self.position.min(LAST_POSITION)])
    }

    pub fn observe(&mut self, last: &GameRecord) {
        match last.outcome {
            GameOutcome::Loss => self.position = (self.position + 1).min(LAST_POSITION),
            GameOutcome::Win => self.position = self.position.saturating_sub(2),
            GameOutcome::Push => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn record(outcome: GameOutcome) -> GameRecord {
        GameRecord {
            sequence: 1,
            bet_amount: dec!(5),
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
    fn test_sequence_table() {
        assert_eq!(SEQUENCE.len(), 20);
        for i in 2..SEQUENCE.len() {
            assert_eq!(SEQUENCE[i], SEQUENCE[i - 1] + SEQUENCE[i - 2]);
        }
    }

    #[test]
    fn test_position_capped_at_end() {
        let mut f = Fibonacci::new(dec!(1));
        for _ in 0..50 {
            f.observe(&record(GameOutcome::Loss));
        }
        assert_eq!(f.position, LAST_POSITION);
        assert_eq!(f.propose(dec!(0)), dec!(6765));
    }

    #[test]
    fn test_win_floors_at_zero() {
        let mut f = Fibonacci::new(dec!(5));
        f.observe(&record(GameOutcome::Loss));
        f.observe(&record(GameOutcome::Win));
        assert_eq!(f.position, 0);
        assert_eq!(f.propose(dec!(0)), dec!(5));
    }
}
