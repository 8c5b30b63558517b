//! Drain-once semantics of the shutdown state machine.
//!
//! Signal delivery and forced exit are process-global and stay untested here;
//! these tests pin the Running → Draining transition the signal loop drives.

use std::sync::Arc;

use eevee_irc_connector::config::ConnectionConfig;
use eevee_irc_connector::irc::{IrcInstance, Registry};
use eevee_irc_connector::nats::NatsPublisher;
use eevee_irc_connector::shutdown::ShutdownCoordinator;

fn fixture() -> (Arc<Registry>, Arc<NatsPublisher>) {
    let registry = Arc::new(Registry::new());
    for name in ["net1", "net2"] {
        registry.insert(IrcInstance::new(ConnectionConfig {
            name: name.to_string(),
            ..ConnectionConfig::default()
        }));
    }
    let publisher = Arc::new(NatsPublisher::new("nats://127.0.0.1:1", "token"));
    (registry, publisher)
}

#[tokio::test]
async fn initiate_quits_every_instance_and_drains_once() {
    let (registry, publisher) = fixture();
    let coordinator = ShutdownCoordinator::new(Arc::clone(&registry), publisher);

    assert!(!coordinator.is_draining());
    let drain = coordinator.initiate("SIGINT");
    let drain = drain.expect("first initiation should start the drain");

    assert!(coordinator.is_draining());
    for instance in registry.snapshot() {
        assert!(instance.is_quitting(), "{} did not get quit", instance.name());
    }

    drain.await.expect("drain task should complete");
}

#[tokio::test]
async fn second_initiation_is_a_no_op() {
    let (registry, publisher) = fixture();
    let coordinator = ShutdownCoordinator::new(registry, publisher);

    let first = coordinator.initiate("SIGTERM");
    assert!(first.is_some());
    let second = coordinator.initiate("SIGTERM");
    assert!(second.is_none());

    if let Some(handle) = first {
        handle.await.expect("drain task should complete");
    }
}

#[tokio::test]
async fn quit_after_drain_remains_idempotent() {
    let (registry, publisher) = fixture();
    let coordinator = ShutdownCoordinator::new(Arc::clone(&registry), publisher);

    let drain = coordinator.initiate("SIGINT");

    // A straggler calling quit again must not panic or hang.
    for instance in registry.snapshot() {
        instance.quit(None);
        assert!(instance.is_quitting());
    }

    if let Some(handle) = drain {
        handle.await.expect("drain task should complete");
    }
}
