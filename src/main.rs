//! WAGER-SIM — single-gambler session simulator
//!
//! Entry point. Loads configuration, initialises structured logging,
//! creates one session from the config and auto-plays it until it ends,
//! the batch runs out, or Ctrl+C arrives.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use wager_sim::config::AppConfig;
use wager_sim::engine::clock::{Clock, SystemClock};
use wager_sim::engine::manager::{BatchStop, SessionManager};
use wager_sim::engine::odds::OddsModel;
use wager_sim::engine::session::PlayResult;
use wager_sim::storage;

const BANNER: &str = r#"
__        ___    ____ _____ ____       ____ ___ __  __
\ \      / / \  / ___| ____|  _ \     / ___|_ _|  \/  |
 \ \ /\ / / _ \| |  _|  _| | |_) |____\___ \| || |\/| |
  \ V  V / ___ \ |_| | |___|  _ <_____|__) | || |  | |
   \_/\_/_/   \_\____|_____|_| \_\    |____/___|_|  |_|

  Single-gambler session simulator
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = AppConfig::resolve_path();
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        name = %cfg.simulator.name,
        config = %config_path,
        gambler_id = %cfg.simulator.gambler_id,
        initial_stake = format!("${:.2}", cfg.session.initial_stake),
        "WAGER-SIM starting up"
    );

    // -- Build the session ------------------------------------------------

    cfg.validation
        .check_parameters(&cfg.session)
        .context("Session parameters rejected by validation thresholds")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut manager = SessionManager::new(clock);

    let handle = manager
        .create_session(
            &cfg.simulator.gambler_id,
            cfg.session.clone(),
            cfg.strategy.build().context("Invalid [strategy] section")?,
            OddsModel::new(cfg.odds.clone()).context("Invalid [odds] section")?,
            cfg.outcome.build().context("Invalid [outcome] section")?,
        )
        .context("Failed to create session")?;
    manager.start(&handle.id)?;

    // -- Auto-play --------------------------------------------------------

    let games = cfg.simulator.games_per_batch;
    let p = cfg.session.default_win_probability;

    if cfg.simulator.auto_play_delay_ms == 0 {
        let report = manager.play_batch(&handle.id, games, p)?;
        info!(
            played = report.played(),
            requested = report.requested,
            stop = ?report.stop,
            "Auto-play finished"
        );
    } else {
        run_paced(&mut manager, &handle.id, games, p, cfg.simulator.auto_play_delay_ms).await;
    }

    // -- Wrap up ----------------------------------------------------------

    let summary = manager.end_manually(&handle.id)?;
    let stats = manager.get_statistics(&handle.id)?;
    println!("\n{summary}\n");
    println!("{stats}\n");

    if let Some(path) = cfg.simulator.snapshot_path.as_deref() {
        let session = manager.remove_session(&handle.id)?;
        storage::save_session(&session, Some(path))?;
        info!(path, "Snapshot written");
    }

    info!(
        final_stake = format!("${:.2}", summary.final_stake),
        net = format!("${:.2}", summary.net_profit),
        status = %summary.status,
        "WAGER-SIM shut down cleanly."
    );

    Ok(())
}

/// Play one strategy-sized game per tick until the batch is done, the
/// session ends, or Ctrl+C arrives.
async fn run_paced(manager: &mut SessionManager, id: &str, games: u32, p: f64, delay_ms: u64) {
    let mut interval = tokio::time::interval(Duration::from_millis(delay_ms));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(delay_ms, games, "Entering auto-play loop. Press Ctrl+C to stop.");

    let mut played = 0;
    let stop = loop {
        if played >= games {
            break BatchStop::Completed;
        }
        tokio::select! {
            _ = interval.tick() => {
                match manager.play_with_strategy(id, p) {
                    Ok(PlayResult::Settled { record, status }) => {
                        played += 1;
                        info!("{record}");
                        if status.is_terminal() {
                            break BatchStop::SessionEnded(status);
                        }
                    }
                    Ok(PlayResult::TimedOut { summary }) => {
                        break BatchStop::SessionEnded(summary.status);
                    }
                    Err(e) => {
                        warn!(error = %e, "Wager rejected, stopping auto-play");
                        break BatchStop::Rejected(e);
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                if let Err(e) = manager.pause(id, "interrupted") {
                    error!(error = %e, "Failed to pause session");
                }
                break BatchStop::Interrupted;
            }
        }
    };

    info!(played, stop = ?stop, "Auto-play finished");
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wager_sim=info"));

    let json_logging = std::env::var("WAGER_SIM_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
