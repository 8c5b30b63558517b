//! Event-to-envelope translation between the IRC relay and the bus.
//!
//! Inbound channel messages become exactly one [`Envelope`] each, published
//! on `chat.message.incoming.irc.<network>.<channel>.<ident>`. Outbound
//! actions arrive on the matching `outgoing` subjects and are routed to the
//! owning instance via the registry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::irc::{IrcEvent, IrcInstance, MessageEvent, Registry};
use crate::nats::NatsPublisher;

/// Platform tag carried in every envelope and subject.
pub const PLATFORM: &str = "irc";

/// Event-type tag for inbound chat messages.
pub const INCOMING_TYPE: &str = "chat.message.incoming";

/// Subject filter for outbound actions addressed to this connector.
pub const OUTGOING_SUBJECT: &str = "chat.message.outgoing.irc.>";

/// Stable identifier of this module as a bus event source.
pub const MODULE_UUID: &str = "7c1f24da-90b5-4f41-8cf0-5f1e2b6a9d03";

/// Canonical bus message for one inbound chat event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Channel the message was seen in.
    pub channel: String,
    /// Our own nick on that network.
    pub instance: String,
    /// Network name from the descriptor.
    pub network: String,
    /// Always [`PLATFORM`].
    pub platform: String,
    /// The relayed source event, verbatim.
    pub raw_event: serde_json::Value,
    /// Always [`MODULE_UUID`].
    #[serde(rename = "srcUUID")]
    pub src_uuid: String,
    /// Message text.
    pub text: String,
    /// Per-event trace id, freshly generated, never reused.
    pub trace: String,
    /// Always [`INCOMING_TYPE`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Sender nickname.
    pub user: String,
}

/// Subject for one inbound message:
/// `chat.message.incoming.irc.<network>.<channel>.<senderIdent>`.
pub fn incoming_subject(network: &str, message: &MessageEvent) -> String {
    format!(
        "{INCOMING_TYPE}.{PLATFORM}.{network}.{}.{}",
        message.target, message.ident
    )
}

/// Build the envelope for one inbound message.
///
/// Pure apart from the freshly generated trace id: two identical events still
/// get distinct traces.
pub fn incoming_envelope(nick: &str, network: &str, message: &MessageEvent) -> Envelope {
    Envelope {
        channel: message.target.clone(),
        instance: nick.to_string(),
        network: network.to_string(),
        platform: PLATFORM.to_string(),
        raw_event: serde_json::to_value(message).unwrap_or(serde_json::Value::Null),
        src_uuid: MODULE_UUID.to_string(),
        text: message.message.clone(),
        trace: Uuid::new_v4().to_string(),
        kind: INCOMING_TYPE.to_string(),
        user: message.nick.clone(),
    }
}

/// Spawn the relay task bridging one instance's message events to the bus.
///
/// Subscribes to the instance's event surface and publishes exactly one
/// envelope per inbound chat message. A message that fails to serialize is
/// logged and dropped; nothing else is affected.
pub fn spawn_relay(
    instance: Arc<IrcInstance>,
    publisher: Arc<NatsPublisher>,
) -> tokio::task::JoinHandle<()> {
    let mut events = instance.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(IrcEvent::Message(message)) => {
                    let subject = incoming_subject(instance.name(), &message);
                    let envelope = incoming_envelope(instance.nick(), instance.name(), &message);
                    match serde_json::to_vec(&envelope) {
                        Ok(payload) => {
                            publisher.publish(&subject, payload).await;
                            info!(
                                producer = "ircClient",
                                instance_uuid = %instance.instance_uuid(),
                                target = %message.target,
                                nick = %message.nick,
                                ident = %message.ident,
                                message = %message.message,
                                "message received"
                            );
                        }
                        Err(e) => {
                            warn!(
                                producer = "ircClient",
                                instance_uuid = %instance.instance_uuid(),
                                "dropping unserializable message event: {e}"
                            );
                        }
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        producer = "ircClient",
                        instance_uuid = %instance.instance_uuid(),
                        "relay lagged, skipped {skipped} events"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// An outbound action received from the bus.
#[derive(Debug, Deserialize)]
struct OutboundAction {
    network: String,
    channel: String,
    text: String,
}

/// Subscribe to outbound actions and route them to the owning instance.
///
/// Malformed payloads and unknown networks are logged and dropped. A no-op
/// while the publisher is disconnected.
pub async fn subscribe_outbound(registry: Arc<Registry>, publisher: &NatsPublisher) {
    publisher
        .subscribe(OUTGOING_SUBJECT, move |subject, payload| {
            match serde_json::from_slice::<OutboundAction>(payload) {
                Ok(action) => match registry.get(&action.network) {
                    Some(instance) => instance.send(&action.channel, &action.text),
                    None => warn!(
                        producer = "core",
                        subject,
                        "outbound action for unknown network {:?}",
                        action.network
                    ),
                },
                Err(e) => warn!(
                    producer = "core",
                    subject, "dropping malformed outbound action: {e}"
                ),
            }
        })
        .await;
}
