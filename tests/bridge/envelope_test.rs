//! Envelope construction and the bus payload contract.

use std::collections::BTreeSet;

use eevee_irc_connector::bridge::{
    incoming_envelope, incoming_subject, INCOMING_TYPE, MODULE_UUID, PLATFORM,
};
use eevee_irc_connector::irc::MessageEvent;

fn inbound() -> MessageEvent {
    MessageEvent {
        target: "#chan".to_string(),
        nick: "alice".to_string(),
        ident: "alice".to_string(),
        hostname: "host.example".to_string(),
        message: "hi".to_string(),
    }
}

#[test]
fn envelope_carries_the_normalized_fields() {
    let envelope = incoming_envelope("eevee", "net1", &inbound());

    assert_eq!(envelope.channel, "#chan");
    assert_eq!(envelope.user, "alice");
    assert_eq!(envelope.text, "hi");
    assert_eq!(envelope.network, "net1");
    assert_eq!(envelope.instance, "eevee");
    assert_eq!(envelope.platform, PLATFORM);
    assert_eq!(envelope.kind, "chat.message.incoming");
    assert_eq!(envelope.src_uuid, MODULE_UUID);
}

#[test]
fn subject_follows_the_bus_pattern() {
    let subject = incoming_subject("net1", &inbound());
    assert_eq!(subject, "chat.message.incoming.irc.net1.#chan.alice");
}

#[test]
fn identical_events_get_distinct_traces() {
    let first = incoming_envelope("eevee", "net1", &inbound());
    let second = incoming_envelope("eevee", "net1", &inbound());

    assert!(!first.trace.is_empty());
    assert!(!second.trace.is_empty());
    assert_ne!(first.trace, second.trace);
}

#[test]
fn json_keys_match_the_bus_contract() {
    let envelope = incoming_envelope("eevee", "net1", &inbound());
    let value = serde_json::to_value(&envelope).expect("envelope should serialize");

    let keys: BTreeSet<String> = value
        .as_object()
        .expect("envelope should be a JSON object")
        .keys()
        .cloned()
        .collect();
    let expected: BTreeSet<String> = [
        "channel", "instance", "network", "platform", "raw_event", "srcUUID", "text", "trace",
        "type", "user",
    ]
    .iter()
    .map(|k| (*k).to_string())
    .collect();

    assert_eq!(keys, expected);
    assert_eq!(value["type"], INCOMING_TYPE);
}

#[test]
fn raw_event_preserves_the_source_payload() {
    let envelope = incoming_envelope("eevee", "net1", &inbound());

    assert_eq!(envelope.raw_event["target"], "#chan");
    assert_eq!(envelope.raw_event["nick"], "alice");
    assert_eq!(envelope.raw_event["hostname"], "host.example");
    assert_eq!(envelope.raw_event["message"], "hi");
}
