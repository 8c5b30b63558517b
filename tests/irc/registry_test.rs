//! Registry behavior: append-only, name lookup, status snapshots.

use eevee_irc_connector::config::ConnectionConfig;
use eevee_irc_connector::irc::{IrcInstance, Registry};

fn instance(name: &str) -> std::sync::Arc<IrcInstance> {
    IrcInstance::new(ConnectionConfig {
        name: name.to_string(),
        ..ConnectionConfig::default()
    })
}

#[test]
fn insert_and_lookup_by_name() {
    let registry = Registry::new();
    registry.insert(instance("net1"));
    registry.insert(instance("net2"));

    assert_eq!(registry.len(), 2);
    let found = registry.get("net2").expect("net2 should be registered");
    assert_eq!(found.name(), "net2");
    assert!(registry.get("net3").is_none());
}

#[test]
fn snapshot_preserves_insertion_order() {
    let registry = Registry::new();
    registry.insert(instance("net1"));
    registry.insert(instance("net2"));
    registry.insert(instance("net3"));

    let names: Vec<String> = registry
        .snapshot()
        .iter()
        .map(|i| i.name().to_string())
        .collect();
    assert_eq!(names, vec!["net1", "net2", "net3"]);
}

#[test]
fn statuses_snapshot_every_ledger() {
    let registry = Registry::new();
    registry.insert(instance("net1"));
    registry.insert(instance("net2"));

    let statuses = registry.statuses();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].0, "net1");
    assert!(!statuses[0].1.connected);
}

#[test]
fn empty_registry_reports_empty() {
    let registry = Registry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
    assert!(registry.snapshot().is_empty());
}
