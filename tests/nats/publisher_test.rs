//! Degraded-mode behavior of the bus publisher.
//!
//! None of these tests require a NATS server: they pin down the deliberate
//! best-effort semantics while no connection exists.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use eevee_irc_connector::nats::NatsPublisher;

fn disconnected() -> NatsPublisher {
    // Port 1 is never a NATS server; connect() would fail fast if called.
    NatsPublisher::new("nats://127.0.0.1:1", "token")
}

#[tokio::test]
async fn publish_while_disconnected_is_a_quiet_drop() {
    let publisher = disconnected();

    publisher.publish("x.y", b"{\"a\":1}".to_vec()).await;

    assert!(!publisher.is_connected().await);
}

#[tokio::test]
async fn subscribe_while_disconnected_never_delivers() {
    let publisher = disconnected();
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);

    publisher
        .subscribe("chat.message.outgoing.irc.>", move |_subject, _payload| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await;

    assert!(publisher.subjects().is_empty());
    assert_eq!(delivered.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn drain_while_disconnected_completes_immediately() {
    let publisher = disconnected();

    publisher.drain().await;

    assert!(!publisher.is_connected().await);
}

#[tokio::test]
async fn failed_connect_leaves_publisher_disconnected() {
    let publisher = disconnected();

    publisher.connect().await;

    assert!(!publisher.is_connected().await);
    // Still safe to use in degraded mode afterwards.
    publisher.publish("x.y", b"{}".to_vec()).await;
}
