//! Stake ledger: balance tracking, boundary enforcement and volatility.
//!
//! Every committed movement appends one `StakeTransaction`. A movement that
//! would cross the floor is rejected outright; a win that would cross the
//! ceiling is capped and reported back as a warning.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::types::{SimError, StakeTransaction, TransactionType};

/// Lower warning band sits 20% above the floor.
const LOWER_WARNING_FACTOR: Decimal = dec!(1.2);
/// Upper warning band starts at 80% of the ceiling.
const UPPER_WARNING_FACTOR: Decimal = dec!(0.8);

// ---------------------------------------------------------------------------
// Update results
// ---------------------------------------------------------------------------

/// Non-fatal signals raised while committing a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerWarning {
    /// The balance was clamped to the ceiling.
    CappedAtMaximum { requested: Decimal, cap: Decimal },
    NearLowerBoundary { balance: Decimal, floor: Decimal },
    NearUpperBoundary { balance: Decimal, ceiling: Decimal },
}

/// Result of one committed transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerUpdate {
    pub previous_balance: Decimal,
    pub new_balance: Decimal,
    pub warnings: Vec<LedgerWarning>,
}

impl LedgerUpdate {
    pub fn was_capped(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, LedgerWarning::CappedAtMaximum { .. }))
    }
}

/// Read-only copy of the ledger for collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StakeLedgerView {
    pub current: Decimal,
    pub peak: Decimal,
    pub lowest: Decimal,
    pub volatility: Decimal,
    pub transactions: Vec<StakeTransaction>,
}

/// Movement of the balance relative to where it started.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StakeFluctuation {
    pub initial: Decimal,
    pub current: Decimal,
    pub change_from_initial: Decimal,
    /// Percentage change from the initial stake.
    pub change_pct: Decimal,
    /// `peak − lowest`
    pub range: Decimal,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeLedger {
    initial_stake: Decimal,
    current_stake: Decimal,
    peak_stake: Decimal,
    lowest_stake: Decimal,
    min_boundary: Decimal,
    max_boundary: Option<Decimal>,
    /// Balance after every committed transaction, starting with the
    /// initial stake.
    balances: Vec<Decimal>,
    transactions: Vec<StakeTransaction>,
    volatility: Decimal,
}

impl StakeLedger {
    /// Open a ledger. The initial stake must be positive and inside the
    /// boundaries; it is recorded as an `InitialStake` transaction.
    pub fn new(
        initial_stake: Decimal,
        min_boundary: Decimal,
        max_boundary: Option<Decimal>,
        at: DateTime<Utc>,
    ) -> Result<Self, SimError> {
        if initial_stake <= Decimal::ZERO {
            return Err(SimError::InvalidAmount(initial_stake));
        }
        if initial_stake < min_boundary {
            return Err(SimError::BoundaryViolation {
                attempted: initial_stake,
                boundary: min_boundary,
            });
        }
        if let Some(max) = max_boundary {
            if initial_stake > max {
                return Err(SimError::BoundaryViolation {
                    attempted: initial_stake,
                    boundary: max,
                });
            }
        }

        let mut ledger = Self {
            initial_stake,
            current_stake: initial_stake,
            peak_stake: initial_stake,
            lowest_stake: initial_stake,
            min_boundary,
            max_boundary,
            balances: vec![initial_stake],
            transactions: Vec::new(),
            volatility: Decimal::ZERO,
        };
        ledger.transactions.push(StakeTransaction {
            id: Uuid::new_v4(),
            kind: TransactionType::InitialStake,
            amount: initial_stake,
            previous_balance: Decimal::ZERO,
            new_balance: initial_stake,
            timestamp: at,
            description: "Initial stake deposit".to_string(),
        });

        info!(
            initial = %initial_stake,
            min = %min_boundary,
            max = ?max_boundary,
            "Stake ledger opened"
        );

        Ok(ledger)
    }

    /// Settle a wager outcome: credit `amount` on a win, debit it on a loss.
    pub fn apply_outcome(
        &mut self,
        amount: Decimal,
        won: bool,
        at: DateTime<Utc>,
    ) -> Result<LedgerUpdate, SimError> {
        if amount < Decimal::ZERO {
            return Err(SimError::InvalidAmount(amount));
        }

        let (kind, requested, description) = if won {
            (TransactionType::BetWin, self.current_stake.checked_add(amount), "Bet won")
        } else {
            (TransactionType::BetLoss, self.current_stake.checked_sub(amount), "Bet lost")
        };
        let requested = requested.ok_or(SimError::InvalidAmount(amount))?;

        self.ensure_above_floor(requested)?;

        let mut warnings = Vec::new();
        let new_balance = match self.max_boundary {
            Some(cap) if requested > cap => {
                warn!(requested = %requested, cap = %cap, "Stake capped at maximum boundary");
                warnings.push(LedgerWarning::CappedAtMaximum { requested, cap });
                cap
            }
            _ => requested,
        };

        Ok(self.commit(kind, amount, new_balance, description, at, warnings))
    }

    /// Add funds. Rejected if the balance would exceed the ceiling.
    pub fn deposit(
        &mut self,
        amount: Decimal,
        description: &str,
        at: DateTime<Utc>,
    ) -> Result<LedgerUpdate, SimError> {
        if amount <= Decimal::ZERO {
            return Err(SimError::InvalidAmount(amount));
        }
        let requested = self
            .current_stake
            .checked_add(amount)
            .ok_or(SimError::InvalidAmount(amount))?;
        if let Some(cap) = self.max_boundary {
            if requested > cap {
                return Err(SimError::BoundaryViolation {
                    attempted: requested,
                    boundary: cap,
                });
            }
        }
        Ok(self.commit(TransactionType::Deposit, amount, requested, description, at, Vec::new()))
    }

    /// Remove funds. Rejected if the balance would fall below the floor.
    pub fn withdraw(
        &mut self,
        amount: Decimal,
        description: &str,
        at: DateTime<Utc>,
    ) -> Result<LedgerUpdate, SimError> {
        if amount <= Decimal::ZERO {
            return Err(SimError::InvalidAmount(amount));
        }
        let requested = self.current_stake - amount;
        self.ensure_above_floor(requested)?;
        Ok(self.commit(TransactionType::Withdrawal, amount, requested, description, at, Vec::new()))
    }

    fn ensure_above_floor(&self, requested: Decimal) -> Result<(), SimError> {
        if requested < self.min_boundary {
            warn!(
                current = %self.current_stake,
                requested = %requested,
                floor = %self.min_boundary,
                "Transaction rejected: would breach minimum boundary"
            );
            return Err(SimError::BoundaryViolation {
                attempted: requested,
                boundary: self.min_boundary,
            });
        }
        Ok(())
    }

    fn commit(
        &mut self,
        kind: TransactionType,
        amount: Decimal,
        new_balance: Decimal,
        description: &str,
        at: DateTime<Utc>,
        mut warnings: Vec<LedgerWarning>,
    ) -> LedgerUpdate {
        let previous_balance = self.current_stake;

        self.current_stake = new_balance;
        self.peak_stake = self.peak_stake.max(new_balance);
        self.lowest_stake = self.lowest_stake.min(new_balance);
        self.balances.push(new_balance);
        self.volatility = mean_absolute_change(&self.balances);

        self.transactions.push(StakeTransaction {
            id: Uuid::new_v4(),
            kind,
            amount,
            previous_balance,
            new_balance,
            timestamp: at,
            description: description.to_string(),
        });

        warnings.extend(self.boundary_warnings(new_balance));
        for warning in &warnings {
            match warning {
                LedgerWarning::NearLowerBoundary { .. } => {
                    warn!(balance = %new_balance, floor = %self.min_boundary, "Stake approaching lower boundary")
                }
                LedgerWarning::NearUpperBoundary { .. } => {
                    warn!(balance = %new_balance, ceiling = ?self.max_boundary, "Stake approaching upper boundary")
                }
                LedgerWarning::CappedAtMaximum { .. } => {}
            }
        }

        debug!(
            kind = %kind,
            amount = %amount,
            before = %previous_balance,
            after = %new_balance,
            volatility = %self.volatility,
            "Ledger transaction committed"
        );

        LedgerUpdate {
            previous_balance,
            new_balance,
            warnings,
        }
    }

    fn boundary_warnings(&self, balance: Decimal) -> Vec<LedgerWarning> {
        let mut warnings = Vec::new();
        let floor = self.min_boundary;
        if balance >= floor && balance < floor.saturating_mul(LOWER_WARNING_FACTOR) {
            warnings.push(LedgerWarning::NearLowerBoundary { balance, floor });
        }
        if let Some(ceiling) = self.max_boundary {
            if balance <= ceiling && balance > ceiling * UPPER_WARNING_FACTOR {
                warnings.push(LedgerWarning::NearUpperBoundary { balance, ceiling });
            }
        }
        warnings
    }

    // -- Accessors ----------------------------------------------------------

    pub fn initial_stake(&self) -> Decimal {
        self.initial_stake
    }

    pub fn current_stake(&self) -> Decimal {
        self.current_stake
    }

    pub fn peak_stake(&self) -> Decimal {
        self.peak_stake
    }

    pub fn lowest_stake(&self) -> Decimal {
        self.lowest_stake
    }

    pub fn min_boundary(&self) -> Decimal {
        self.min_boundary
    }

    pub fn max_boundary(&self) -> Option<Decimal> {
        self.max_boundary
    }

    /// Mean absolute step between consecutive balances.
    pub fn volatility(&self) -> Decimal {
        self.volatility
    }

    pub fn balances(&self) -> &[Decimal] {
        &self.balances
    }

    pub fn transactions(&self) -> &[StakeTransaction] {
        &self.transactions
    }

    /// Transactions with `start <= timestamp <= end`.
    pub fn transactions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<&StakeTransaction> {
        self.transactions
            .iter()
            .filter(|t| t.timestamp >= start && t.timestamp <= end)
            .collect()
    }

    pub fn view(&self) -> StakeLedgerView {
        StakeLedgerView {
            current: self.current_stake,
            peak: self.peak_stake,
            lowest: self.lowest_stake,
            volatility: self.volatility,
            transactions: self.transactions.clone(),
        }
    }

    pub fn fluctuation(&self) -> StakeFluctuation {
        let change = self.current_stake - self.initial_stake;
        StakeFluctuation {
            initial: self.initial_stake,
            current: self.current_stake,
            change_from_initial: change,
            change_pct: change
                .checked_div(self.initial_stake)
                .map(|ratio| ratio.saturating_mul(dec!(100)))
                .unwrap_or(Decimal::MAX),
            range: self.peak_stake - self.lowest_stake,
        }
    }
}

/// Mean of `|b[i] − b[i−1]|`; zero with fewer than two balances.
pub fn mean_absolute_change(balances: &[Decimal]) -> Decimal {
    if balances.len() < 2 {
        return Decimal::ZERO;
    }
    let total = balances
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .fold(Decimal::ZERO, |acc, step| acc.saturating_add(step));
    total / Decimal::from(balances.len() - 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(initial: Decimal) -> StakeLedger {
        StakeLedger::new(initial, Decimal::ZERO, None, Utc::now()).unwrap()
    }

    fn bounded(initial: Decimal, min: Decimal, max: Decimal) -> StakeLedger {
        StakeLedger::new(initial, min, Some(max), Utc::now()).unwrap()
    }

    #[test]
    fn test_new_records_initial_transaction() {
        let l = ledger(dec!(500));
        assert_eq!(l.current_stake(), dec!(500));
        assert_eq!(l.transactions().len(), 1);
        assert_eq!(l.transactions()[0].kind, TransactionType::InitialStake);
        assert_eq!(l.volatility(), Decimal::ZERO);
    }

    #[test]
    fn test_win_overflowing_balance_is_rejected() {
        let mut l = ledger(dec!(100));
        let err = l.apply_outcome(Decimal::MAX, true, Utc::now()).unwrap_err();
        assert_eq!(err, SimError::InvalidAmount(Decimal::MAX));
        assert_eq!(l.current_stake(), dec!(100));
        assert_eq!(l.transactions().len(), 1);

        assert_eq!(
            l.deposit(Decimal::MAX, "top up", Utc::now()),
            Err(SimError::InvalidAmount(Decimal::MAX))
        );
    }

    #[test]
    fn test_new_rejects_bad_initial_stake() {
        assert_eq!(
            StakeLedger::new(Decimal::ZERO, Decimal::ZERO, None, Utc::now()),
            Err(SimError::InvalidAmount(Decimal::ZERO))
        );
        assert!(matches!(
            StakeLedger::new(dec!(50), dec!(100), None, Utc::now()),
            Err(SimError::BoundaryViolation { .. })
        ));
        assert!(matches!(
            StakeLedger::new(dec!(500), Decimal::ZERO, Some(dec!(400)), Utc::now()),
            Err(SimError::BoundaryViolation { .. })
        ));
    }

    #[test]
    fn test_win_and_loss_move_balance() {
        let mut l = ledger(dec!(100));
        let up = l.apply_outcome(dec!(30), true, Utc::now()).unwrap();
        assert_eq!(up.previous_balance, dec!(100));
        assert_eq!(up.new_balance, dec!(130));

        let down = l.apply_outcome(dec!(50), false, Utc::now()).unwrap();
        assert_eq!(down.new_balance, dec!(80));

        let kinds: Vec<_> = l.transactions().iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TransactionType::InitialStake, TransactionType::BetWin, TransactionType::BetLoss]
        );
    }

    #[test]
    fn test_peak_and_lowest_bracket_current() {
        let mut l = ledger(dec!(100));
        for (amount, won) in [(dec!(20), true), (dec!(50), false), (dec!(10), true), (dec!(5), false)] {
            l.apply_outcome(amount, won, Utc::now()).unwrap();
            assert!(l.lowest_stake() <= l.current_stake());
            assert!(l.current_stake() <= l.peak_stake());
        }
        assert_eq!(l.peak_stake(), dec!(120));
        assert_eq!(l.lowest_stake(), dec!(70));
    }

    #[test]
    fn test_loss_below_floor_is_rejected_untouched() {
        let mut l = bounded(dec!(100), dec!(60), dec!(1000));
        let err = l.apply_outcome(dec!(50), false, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            SimError::BoundaryViolation {
                attempted: dec!(50),
                boundary: dec!(60)
            }
        );
        // Nothing committed.
        assert_eq!(l.current_stake(), dec!(100));
        assert_eq!(l.transactions().len(), 1);
        assert_eq!(l.balances().len(), 1);
    }

    #[test]
    fn test_loss_landing_on_floor_is_allowed() {
        let mut l = bounded(dec!(100), dec!(60), dec!(1000));
        assert_eq!(l.apply_outcome(dec!(40), false, Utc::now()).unwrap().new_balance, dec!(60));
    }

    #[test]
    fn test_win_above_ceiling_is_capped() {
        let mut l = bounded(dec!(100), Decimal::ZERO, dec!(150));
        let update = l.apply_outcome(dec!(80), true, Utc::now()).unwrap();
        assert_eq!(update.new_balance, dec!(150));
        assert!(update.was_capped());
        assert_eq!(l.current_stake(), dec!(150));
        assert_eq!(l.peak_stake(), dec!(150));
    }

    #[test]
    fn test_near_boundary_warnings() {
        let mut l = bounded(dec!(500), dec!(100), dec!(1000));
        let low = l.apply_outcome(dec!(390), false, Utc::now()).unwrap();
        assert!(low
            .warnings
            .iter()
            .any(|w| matches!(w, LedgerWarning::NearLowerBoundary { .. })));

        let high = l.apply_outcome(dec!(750), true, Utc::now()).unwrap();
        assert!(high
            .warnings
            .iter()
            .any(|w| matches!(w, LedgerWarning::NearUpperBoundary { .. })));
        assert!(!high.was_capped());
    }

    #[test]
    fn test_deposit_and_withdraw_boundaries() {
        let mut l = bounded(dec!(100), dec!(50), dec!(200));

        assert_eq!(l.deposit(dec!(50), "top up", Utc::now()).unwrap().new_balance, dec!(150));
        assert!(matches!(
            l.deposit(dec!(60), "too much", Utc::now()),
            Err(SimError::BoundaryViolation { .. })
        ));
        assert_eq!(l.current_stake(), dec!(150));

        assert_eq!(l.withdraw(dec!(100), "cash out", Utc::now()).unwrap().new_balance, dec!(50));
        assert!(matches!(
            l.withdraw(dec!(1), "overdraw", Utc::now()),
            Err(SimError::BoundaryViolation { .. })
        ));

        assert!(l.deposit(Decimal::ZERO, "nothing", Utc::now()).is_err());
        assert!(l.withdraw(dec!(-5), "negative", Utc::now()).is_err());
    }

    #[test]
    fn test_volatility_is_mean_absolute_step() {
        let mut l = ledger(dec!(100));
        l.apply_outcome(dec!(20), true, Utc::now()).unwrap(); // 120, step 20
        assert_eq!(l.volatility(), dec!(20));
        l.apply_outcome(dec!(40), false, Utc::now()).unwrap(); // 80, step 40
        assert_eq!(l.volatility(), dec!(30));
        l.deposit(dec!(30), "top up", Utc::now()).unwrap(); // 110, step 30
        assert_eq!(l.volatility(), dec!(30));
    }

    #[test]
    fn test_mean_absolute_change_short_history() {
        assert_eq!(mean_absolute_change(&[]), Decimal::ZERO);
        assert_eq!(mean_absolute_change(&[dec!(10)]), Decimal::ZERO);
    }

    #[test]
    fn test_fluctuation_and_view() {
        let mut l = ledger(dec!(200));
        l.apply_outcome(dec!(50), true, Utc::now()).unwrap();
        l.apply_outcome(dec!(100), false, Utc::now()).unwrap();

        let f = l.fluctuation();
        assert_eq!(f.change_from_initial, dec!(-50));
        assert_eq!(f.change_pct, dec!(-25));
        assert_eq!(f.range, dec!(100));

        let v = l.view();
        assert_eq!(v.current, dec!(150));
        assert_eq!(v.peak, dec!(250));
        assert_eq!(v.lowest, dec!(150));
        assert_eq!(v.transactions.len(), 3);
    }

    #[test]
    fn test_transactions_between() {
        let start = Utc::now();
        let mut l = StakeLedger::new(dec!(100), Decimal::ZERO, None, start).unwrap();
        l.apply_outcome(dec!(10), true, start + chrono::Duration::minutes(1)).unwrap();
        l.apply_outcome(dec!(10), true, start + chrono::Duration::minutes(5)).unwrap();

        let window = l.transactions_between(
            start + chrono::Duration::seconds(30),
            start + chrono::Duration::minutes(5),
        );
        assert_eq!(window.len(), 2);
        assert!(window.iter().all(|t| t.kind == TransactionType::BetWin));
    }
}
