//! Health snapshots across all status ledgers.

use std::sync::Arc;
use std::time::Instant;

use eevee_irc_connector::config::ConnectionConfig;
use eevee_irc_connector::health::{check_health, write_health_file, HealthReport};
use eevee_irc_connector::irc::{IrcInstance, Registry};

fn registry_with(names: &[&str]) -> Arc<Registry> {
    let registry = Arc::new(Registry::new());
    for name in names {
        registry.insert(IrcInstance::new(ConnectionConfig {
            name: (*name).to_string(),
            ..ConnectionConfig::default()
        }));
    }
    registry
}

#[test]
fn report_covers_every_connection() {
    let registry = registry_with(&["net1", "net2"]);

    let report = check_health(&registry, Instant::now());

    assert_eq!(report.connections.len(), 2);
    assert_eq!(report.connections[0].name, "net1");
    assert!(!report.connections[0].connected);
    // Nothing is registered yet, so the bridge is unhealthy.
    assert_eq!(report.status, "unhealthy");
    assert!(!report.last_heartbeat.is_empty());
}

#[test]
fn empty_registry_counts_as_running() {
    let registry = registry_with(&[]);

    let report = check_health(&registry, Instant::now());

    assert!(report.connections.is_empty());
    assert_eq!(report.status, "running");
}

#[tokio::test]
async fn health_file_is_written_atomically() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("health.json");
    let registry = registry_with(&["net1"]);
    let report = check_health(&registry, Instant::now());

    write_health_file(&report, &path)
        .await
        .expect("health write should succeed");

    let contents = std::fs::read_to_string(&path).expect("health file should exist");
    let parsed: HealthReport = serde_json::from_str(&contents).expect("should parse back");
    assert_eq!(parsed.connections.len(), 1);
    // The temp file must not linger after the rename.
    assert!(!path.with_extension("json.tmp").exists());
}
