//! Instance lifecycle behavior that does not need a live server.

use eevee_irc_connector::config::ConnectionConfig;
use eevee_irc_connector::irc::{IrcError, IrcInstance};

fn descriptor(name: &str) -> ConnectionConfig {
    ConnectionConfig {
        name: name.to_string(),
        ..ConnectionConfig::default()
    }
}

#[test]
fn new_instance_starts_disconnected() {
    let instance = IrcInstance::new(descriptor("net1"));

    let status = instance.status();
    assert!(!status.connected);
    assert!(status.channels.is_empty());
    assert_eq!(status.remote_host, "");
    assert_eq!(status.current_nick, "");
    assert_eq!(instance.name(), "net1");
    assert!(!instance.is_quitting());
}

#[test]
fn correlation_ids_are_process_unique() {
    let a = IrcInstance::new(descriptor("net1"));
    let b = IrcInstance::new(descriptor("net1"));

    assert_ne!(a.instance_uuid(), b.instance_uuid());
    assert!(a.instance_ident().ends_with("-net1"));
}

#[test]
fn join_before_connect_is_recorded_and_queued() {
    let instance = IrcInstance::new(descriptor("net1"));

    instance.join("#a", "");
    instance.join("#b", "hunter2");

    let requested = instance.requested_channels();
    assert_eq!(requested.len(), 2);
    assert_eq!(requested[0].channel, "#a");
    assert_eq!(requested[0].key, "");
    assert_eq!(requested[1].key, "hunter2");
}

#[test]
fn quit_before_connect_is_idempotent() {
    let instance = IrcInstance::new(descriptor("net1"));

    instance.quit(None);
    instance.quit(Some("again"));

    assert!(instance.is_quitting());
}

#[tokio::test]
async fn connect_refuses_reentry_while_driver_runs() {
    let instance = IrcInstance::new(descriptor("net1"));

    instance.connect().expect("first connect should start");
    let second = instance.connect();

    assert!(matches!(second, Err(IrcError::AlreadyConnecting(name)) if name == "net1"));

    // Stop the driver's reconnect loop before the runtime shuts down.
    instance.quit(None);
}

#[test]
fn send_while_disconnected_does_not_panic() {
    let instance = IrcInstance::new(descriptor("net1"));

    instance.send("#chan", "dropped on the floor");
}
