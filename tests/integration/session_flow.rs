//! End-to-end session flows driven through `SessionManager`.

use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use wager_sim::engine::clock::ManualClock;
use wager_sim::engine::manager::{BatchStop, SessionManager};
use wager_sim::engine::odds::{OddsConfiguration, OddsModel, OddsScheme};
use wager_sim::engine::outcome::{OutcomeSource, RandomOutcome};
use wager_sim::engine::session::PlayResult;
use wager_sim::storage;
use wager_sim::strategy::StrategyConfig;
use wager_sim::types::{
    SessionEndReason, SessionParameters, SessionStatus, SimError, TransactionType,
};

use crate::scripted_outcome::ScriptedOutcome;

fn standard_params() -> SessionParameters {
    SessionParameters::new(dec!(500), dec!(700), dec!(200))
}

fn fair_odds() -> OddsModel {
    OddsModel::new(OddsConfiguration::default()).unwrap()
}

fn setup(
    params: SessionParameters,
    strategy: StrategyConfig,
    outcomes: Box<dyn OutcomeSource>,
) -> (SessionManager, String, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let mut manager = SessionManager::new(clock.clone());
    let handle = manager
        .create_session(
            "gambler-it",
            params,
            strategy.build().unwrap(),
            fair_odds(),
            outcomes,
        )
        .unwrap();
    (manager, handle.id, clock)
}

fn fixed(amount: Decimal) -> StrategyConfig {
    StrategyConfig::Fixed { amount }
}

// ---------------------------------------------------------------------------
// Reproducibility
// ---------------------------------------------------------------------------

fn seeded_run(seed: u64) -> Vec<(String, Decimal, Decimal)> {
    let (mut m, id, _) = setup(
        standard_params(),
        fixed(dec!(50)),
        Box::new(RandomOutcome::seeded(seed)),
    );
    m.start(&id).unwrap();
    let report = m.play_batch(&id, 20, 0.5).unwrap();
    report
        .records
        .iter()
        .map(|r| (r.outcome.to_string(), r.bet_amount, r.stake_after))
        .collect()
}

#[test]
fn test_same_seed_reproduces_game_sequence() {
    let first = seeded_run(42);
    let second = seeded_run(42);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Boundaries
// ---------------------------------------------------------------------------

#[test]
fn test_landing_on_upper_limit_ends_as_win() {
    let (mut m, id, _) = setup(standard_params(), fixed(dec!(50)), Box::new(ScriptedOutcome::wins(10)));
    m.start(&id).unwrap();

    let report = m.play_batch(&id, 10, 0.5).unwrap();
    assert_eq!(report.played(), 4);
    assert_eq!(report.stop, BatchStop::SessionEnded(SessionStatus::EndedWin));

    let summary = m.get_summary(&id).unwrap();
    assert_eq!(summary.final_stake, dec!(700));
    assert_eq!(summary.end_reason, SessionEndReason::UpperLimitReached);
    assert!(summary.authoritative);
}

#[test]
fn test_landing_on_lower_limit_ends_as_loss() {
    let (mut m, id, _) = setup(standard_params(), fixed(dec!(100)), Box::new(ScriptedOutcome::losses(10)));
    m.start(&id).unwrap();

    let report = m.play_batch(&id, 10, 0.5).unwrap();
    assert_eq!(report.played(), 3);
    assert_eq!(report.stop, BatchStop::SessionEnded(SessionStatus::EndedLoss));
    assert_eq!(m.get_stake_ledger_view(&id).unwrap().current, dec!(200));
}

#[test]
fn test_stake_bracketed_by_peak_and_lowest() {
    let params = SessionParameters::new(dec!(1000), dec!(100000), dec!(1));
    let (mut m, id, _) = setup(
        params,
        StrategyConfig::Martingale { base: dec!(10) },
        Box::new(RandomOutcome::seeded(7)),
    );
    m.start(&id).unwrap();

    for _ in 0..200 {
        match m.play_with_strategy(&id, 0.45) {
            Ok(result) => {
                let view = m.get_stake_ledger_view(&id).unwrap();
                assert!(view.lowest <= view.current && view.current <= view.peak);
                if result.ended_session() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_pause_accounting() {
    let (mut m, id, clock) = setup(standard_params(), fixed(dec!(50)), Box::new(ScriptedOutcome::wins(1)));
    m.start(&id).unwrap();

    m.pause(&id, "instant").unwrap();
    m.resume(&id).unwrap();
    assert_eq!(m.get(&id).unwrap().session().total_pause_duration_seconds(), 0);

    m.pause(&id, "phone call").unwrap();
    clock.advance(Duration::seconds(45));
    m.resume(&id).unwrap();
    assert_eq!(m.get(&id).unwrap().session().total_pause_duration_seconds(), 45);

    clock.advance(Duration::seconds(15));
    let summary = m.end_manually(&id).unwrap();
    assert_eq!(summary.total_seconds, 60);
    assert_eq!(summary.paused_seconds, 45);
    assert_eq!(summary.active_seconds, 15);
    assert_eq!(summary.pause_count, 2);
}

#[test]
fn test_terminal_session_rejects_everything_but_end() {
    let (mut m, id, _) = setup(standard_params(), fixed(dec!(50)), Box::new(ScriptedOutcome::wins(1)));
    m.start(&id).unwrap();
    m.end_manually(&id).unwrap();

    assert!(matches!(
        m.play_game(&id, dec!(50), 0.5),
        Err(SimError::InvalidTransition {
            from: SessionStatus::EndedManual,
            ..
        })
    ));
    assert!(m.pause(&id, "late").is_err());
    assert!(m.resume(&id).is_err());
    assert!(m.start(&id).is_err());

    let again = m.end_manually(&id).unwrap();
    assert_eq!(again.status, SessionStatus::EndedManual);
}

#[test]
fn test_session_times_out_while_paused() {
    let (mut m, id, clock) = setup(standard_params(), fixed(dec!(50)), Box::new(ScriptedOutcome::wins(1)));
    m.start(&id).unwrap();
    m.pause(&id, "overnight").unwrap();
    clock.advance(Duration::hours(4));

    assert_eq!(m.resume(&id).unwrap(), SessionStatus::EndedTimeout);
    let summary = m.get_summary(&id).unwrap();
    assert_eq!(summary.end_reason, SessionEndReason::Timeout);
    assert_eq!(summary.paused_seconds, 4 * 3600);
}

#[test]
fn test_play_after_deadline_times_out() {
    let (mut m, id, clock) = setup(standard_params(), fixed(dec!(50)), Box::new(ScriptedOutcome::wins(5)));
    m.start(&id).unwrap();
    m.play_default(&id).unwrap();
    clock.advance(Duration::minutes(181));

    let result = m.play_default(&id).unwrap();
    match result {
        PlayResult::TimedOut { summary } => {
            assert_eq!(summary.status, SessionStatus::EndedTimeout);
            assert_eq!(summary.games_played, 1);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

#[test]
fn test_batch_stops_when_stake_below_minimum_bet() {
    let params = SessionParameters::new(dec!(500), dec!(10000), dec!(0));
    let (mut m, id, _) = setup(params, fixed(dec!(495)), Box::new(ScriptedOutcome::losses(5)));
    m.start(&id).unwrap();

    let report = m.play_batch(&id, 5, 0.5).unwrap();
    assert_eq!(report.played(), 1);
    assert_eq!(
        report.stop,
        BatchStop::Rejected(SimError::BetOutOfRange {
            amount: dec!(5),
            min: dec!(10),
            max: dec!(500),
        })
    );
    assert_eq!(m.get(&id).unwrap().status(), SessionStatus::Active);
}

#[test]
fn test_batch_stops_at_game_limit() {
    let mut params = SessionParameters::new(dec!(500), dec!(10000), dec!(10));
    params.max_games_per_session = 3;
    let (mut m, id, _) = setup(params, fixed(dec!(10)), Box::new(ScriptedOutcome::wins(10)));
    m.start(&id).unwrap();

    let report = m.play_batch(&id, 10, 0.5).unwrap();
    assert_eq!(report.played(), 3);
    assert!(matches!(
        report.stop,
        BatchStop::Rejected(SimError::SessionLimitReached(_))
    ));
}

// ---------------------------------------------------------------------------
// Odds, ledger and snapshots
// ---------------------------------------------------------------------------

#[test]
fn test_fixed_odds_payout_and_transactions() {
    let clock = Arc::new(ManualClock::starting_now());
    let mut m = SessionManager::new(clock);
    let id = m
        .create_session(
            "g",
            standard_params(),
            fixed(dec!(20)).build().unwrap(),
            OddsModel::new(OddsConfiguration {
                multiplier: dec!(2),
                scheme: OddsScheme::Fixed,
            })
            .unwrap(),
            Box::new(ScriptedOutcome::new(&[true, false])),
        )
        .unwrap()
        .id;
    m.start(&id).unwrap();
    m.play_default(&id).unwrap();
    m.play_default(&id).unwrap();

    let view = m.get_stake_ledger_view(&id).unwrap();
    assert_eq!(view.current, dec!(520));
    let kinds: Vec<_> = view.transactions.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TransactionType::InitialStake,
            TransactionType::BetWin,
            TransactionType::BetLoss
        ]
    );

    let stats = m.get_statistics(&id).unwrap();
    assert_eq!(stats.total_winnings, dec!(40));
    assert_eq!(stats.total_losses, dec!(20));
}

#[test]
fn test_snapshot_restore_resumes_strategy() {
    let params = SessionParameters::new(dec!(500), dec!(10000), dec!(10));
    let (mut m, id, _) = setup(
        params,
        StrategyConfig::Fibonacci { base: dec!(5) },
        Box::new(ScriptedOutcome::losses(3)),
    );
    m.start(&id).unwrap();
    m.play_batch(&id, 3, 0.5).unwrap();

    let path = std::env::temp_dir()
        .join(format!("wager_sim_it_{}.json", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .to_string();
    let archived = m.remove_session(&id).unwrap();
    storage::save_session(&archived, Some(&path)).unwrap();

    let loaded = storage::load_session(Some(&path)).unwrap().unwrap();
    let handle = m.restore_session(loaded, fair_odds(), Box::new(ScriptedOutcome::wins(1)));
    assert_eq!(handle.id, id);

    // Three losses put Fibonacci at position 3: 5 × 3 = 15.
    let result = m.play_with_strategy(&id, 0.5).unwrap();
    assert_eq!(result.record().map(|r| r.bet_amount), Some(dec!(15)));
    assert_eq!(result.record().map(|r| r.sequence), Some(4));

    storage::delete_snapshot(Some(&path)).unwrap();
}
