//! Session snapshots.
//!
//! A snapshot wraps a session's plain data (records, ledger, strategy
//! progression) in a versioned envelope and writes it as JSON. Loading
//! refuses other format versions and sessions whose parameters no longer
//! validate. Snapshots are a convenience for inspecting or continuing a
//! session; nothing here is crash-safe.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::engine::session::Session;

/// Default snapshot file path.
pub const DEFAULT_SNAPSHOT_FILE: &str = "wager_sim_session.json";

/// Bumped whenever `Session`'s serialised shape changes.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    format_version: u32,
    saved_at: DateTime<Utc>,
    /// Stake at save time, kept for a quick look at the file.
    stake: String,
    session: Session,
}

/// Save a session snapshot to a JSON file.
pub fn save_session(session: &Session, path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_SNAPSHOT_FILE);
    let snapshot = Snapshot {
        format_version: SNAPSHOT_FORMAT_VERSION,
        saved_at: Utc::now(),
        stake: format!("{:.2}", session.current_stake()),
        session: session.clone(),
    };
    let json = serde_json::to_string_pretty(&snapshot).context("Failed to serialise session")?;

    std::fs::write(path, &json).with_context(|| format!("Failed to write snapshot to {path}"))?;

    debug!(
        path,
        session_id = %session.id,
        status = %session.status,
        games = session.games_played,
        stake = %snapshot.stake,
        "Session snapshot saved"
    );
    Ok(())
}

/// Load a session snapshot. Returns `None` if the file doesn't exist.
pub fn load_session(path: Option<&str>) -> Result<Option<Session>> {
    let path = path.unwrap_or(DEFAULT_SNAPSHOT_FILE);

    if !Path::new(path).exists() {
        info!(path, "No session snapshot found");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot from {path}"))?;
    let snapshot: Snapshot = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse snapshot from {path}"))?;

    if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
        bail!(
            "Snapshot {path} has format version {}, expected {SNAPSHOT_FORMAT_VERSION}",
            snapshot.format_version
        );
    }
    let session = snapshot.session;
    session
        .parameters
        .validate()
        .with_context(|| format!("Snapshot {path} carries invalid session parameters"))?;

    info!(
        path,
        session_id = %session.id,
        status = %session.status,
        games = session.games_played,
        saved_at = %snapshot.saved_at,
        "Session snapshot loaded"
    );

    Ok(Some(session))
}

/// Delete a snapshot file. Missing files are fine.
pub fn delete_snapshot(path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_SNAPSHOT_FILE);
    if Path::new(path).exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to delete snapshot file {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
