//! Deterministic outcome source for driving sessions from tests.

use std::collections::VecDeque;

use wager_sim::engine::outcome::OutcomeSource;

/// Replays a fixed win/loss script. Once the script runs out every further
/// wager loses.
pub struct ScriptedOutcome {
    script: VecDeque<bool>,
    calls: usize,
}

impl ScriptedOutcome {
    pub fn new(script: &[bool]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            calls: 0,
        }
    }

    pub fn wins(n: usize) -> Self {
        Self::new(&vec![true; n])
    }

    pub fn losses(n: usize) -> Self {
        Self::new(&vec![false; n])
    }
}

impl OutcomeSource for ScriptedOutcome {
    fn decide(&mut self, _win_probability: f64) -> bool {
        self.calls += 1;
        self.script.pop_front().unwrap_or(false)
    }

    fn name(&self) -> String {
        format!("Scripted ({} left, {} drawn)", self.script.len(), self.calls)
    }
}
