//! Periodic health snapshots of every connection's status ledger.
//!
//! Each tick gathers a weakly consistent snapshot across all instances and
//! writes an atomic `health.json` (write to a temp file, then rename), so
//! readers always see a complete report.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::irc::Registry;

/// Interval between health snapshots.
const HEALTH_INTERVAL_SECS: u64 = 30;

/// Health report written to disk each tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Overall status: `running`, `degraded`, or `unhealthy`.
    pub status: String,
    /// Seconds since process start.
    pub uptime_secs: u64,
    /// ISO 8601 timestamp of this report.
    pub last_heartbeat: String,
    /// Per-connection state.
    pub connections: Vec<ConnectionHealth>,
}

/// One connection's slice of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionHealth {
    /// Network name from the descriptor.
    pub name: String,
    /// Whether the connection is registered.
    pub connected: bool,
    /// Host the connection points at.
    pub remote_host: String,
    /// Nick the server accepted.
    pub current_nick: String,
    /// Channels joined so far.
    pub channels: Vec<String>,
}

/// Snapshot every registered instance into a [`HealthReport`].
pub fn check_health(registry: &Registry, start_time: Instant) -> HealthReport {
    let connections: Vec<ConnectionHealth> = registry
        .statuses()
        .into_iter()
        .map(|(name, status)| ConnectionHealth {
            name,
            connected: status.connected,
            remote_host: status.remote_host,
            current_nick: status.current_nick,
            channels: status.channels,
        })
        .collect();

    let up = connections.iter().filter(|c| c.connected).count();
    let status = if up == connections.len() {
        "running".to_string()
    } else if up > 0 {
        "degraded".to_string()
    } else {
        "unhealthy".to_string()
    };

    HealthReport {
        status,
        uptime_secs: start_time.elapsed().as_secs(),
        last_heartbeat: chrono::Utc::now().to_rfc3339(),
        connections,
    }
}

/// Write a health report to disk atomically.
///
/// Writes to a temporary file first, then renames to the final path.
///
/// # Errors
///
/// Returns an error if serialization or file operations fail.
pub async fn write_health_file(report: &HealthReport, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| anyhow::anyhow!("failed to serialize health report: {e}"))?;

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| anyhow::anyhow!("failed to write health temp file: {e}"))?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to rename health temp file: {e}"))?;

    debug!(producer = "core", "health file updated");
    Ok(())
}

/// Spawn the periodic health writer task.
pub fn spawn_health_writer(registry: Arc<Registry>, path: PathBuf) -> tokio::task::JoinHandle<()> {
    let start_time = Instant::now();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(HEALTH_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            let report = check_health(&registry, start_time);
            if let Err(e) = write_health_file(&report, &path).await {
                warn!(producer = "core", "health write failed: {e}");
            }
        }
    })
}
