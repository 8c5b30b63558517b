//! Thin façade over the NATS bus client.
//!
//! Deliberately tolerant of a missing connection: `connect()` failures leave
//! the publisher in a disconnected state, and `publish`/`subscribe` become
//! logged no-ops rather than errors. The IRC side of the connector keeps
//! running in a degraded, bus-less mode until the process is restarted. No
//! queueing and no retry: messages published while disconnected are dropped.

use std::sync::{Mutex, PoisonError};

use tokio_stream::StreamExt;
use tracing::{info, warn};
use uuid::Uuid;

/// Publisher handle shared by the translator tasks and the shutdown
/// coordinator.
pub struct NatsPublisher {
    instance_uuid: Uuid,
    host: String,
    token: String,
    client: tokio::sync::RwLock<Option<async_nats::Client>>,
    /// Subjects with an open subscription.
    subjects: Mutex<Vec<String>>,
}

impl NatsPublisher {
    /// Create a disconnected publisher for the given endpoint.
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            instance_uuid: Uuid::new_v4(),
            host: host.into(),
            token: token.into(),
            client: tokio::sync::RwLock::new(None),
            subjects: Mutex::new(Vec::new()),
        }
    }

    /// Process-unique correlation id for log attribution.
    pub fn instance_uuid(&self) -> Uuid {
        self.instance_uuid
    }

    /// Attempt to establish the bus connection.
    ///
    /// Failure is logged and leaves the publisher disconnected; it never
    /// aborts the process.
    pub async fn connect(&self) {
        match async_nats::ConnectOptions::with_token(self.token.clone())
            .connect(self.host.clone())
            .await
        {
            Ok(client) => {
                info!(
                    producer = "natsClient",
                    instance_uuid = %self.instance_uuid,
                    "connected to NATS at {}",
                    self.host
                );
                *self.client.write().await = Some(client);
            }
            Err(e) => {
                warn!(
                    producer = "natsClient",
                    instance_uuid = %self.instance_uuid,
                    "failed to connect to NATS at {}: {e}",
                    self.host
                );
            }
        }
    }

    /// Whether a live bus connection exists.
    pub async fn is_connected(&self) -> bool {
        self.client.read().await.is_some()
    }

    /// Publish a payload on a subject.
    ///
    /// While disconnected this logs exactly one warning per attempt and
    /// discards the message — at-most-once, best-effort.
    pub async fn publish(&self, subject: &str, payload: Vec<u8>) {
        let Some(client) = self.client.read().await.clone() else {
            warn!(
                producer = "natsClient",
                instance_uuid = %self.instance_uuid,
                subject,
                "not connected to NATS, dropping message"
            );
            return;
        };
        if let Err(e) = client.publish(subject.to_string(), payload.into()).await {
            warn!(
                producer = "natsClient",
                instance_uuid = %self.instance_uuid,
                subject,
                "publish failed: {e}"
            );
        }
    }

    /// Open a subscription and deliver every message to `callback`.
    ///
    /// The delivery loop runs as a background task until the subscription
    /// closes (typically during drain), then logs closure. While disconnected
    /// this is a logged no-op; the subscription is not deferred.
    pub async fn subscribe<F>(&self, subject: &str, callback: F)
    where
        F: Fn(&str, &[u8]) + Send + Sync + 'static,
    {
        let Some(client) = self.client.read().await.clone() else {
            warn!(
                producer = "natsClient",
                instance_uuid = %self.instance_uuid,
                subject,
                "not connected to NATS, ignoring subscription"
            );
            return;
        };
        let mut subscription = match client.subscribe(subject.to_string()).await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(
                    producer = "natsClient",
                    instance_uuid = %self.instance_uuid,
                    subject,
                    "subscribe failed: {e}"
                );
                return;
            }
        };
        self.guard().push(subject.to_string());

        let instance_uuid = self.instance_uuid;
        let subject = subject.to_string();
        tokio::spawn(async move {
            while let Some(message) = subscription.next().await {
                callback(message.subject.as_str(), &message.payload);
            }
            info!(
                producer = "natsClient",
                instance_uuid = %instance_uuid,
                subject,
                "subscription closed"
            );
        });
    }

    /// Subjects with an open subscription, in subscription order.
    pub fn subjects(&self) -> Vec<String> {
        self.guard().clone()
    }

    /// Flush in-flight work and close the connection.
    ///
    /// Suspends until the underlying client finishes or reports failure.
    /// A no-op while disconnected.
    pub async fn drain(&self) {
        let Some(client) = self.client.read().await.clone() else {
            info!(
                producer = "natsClient",
                instance_uuid = %self.instance_uuid,
                "not connected to NATS, nothing to drain"
            );
            return;
        };
        match client.drain().await {
            Ok(()) => info!(
                producer = "natsClient",
                instance_uuid = %self.instance_uuid,
                "NATS connection drained"
            ),
            Err(e) => warn!(
                producer = "natsClient",
                instance_uuid = %self.instance_uuid,
                "NATS drain failed: {e}"
            ),
        }
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.subjects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for NatsPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsPublisher")
            .field("host", &self.host)
            .field("token", &"__REDACTED__")
            .field("instance_uuid", &self.instance_uuid)
            .finish_non_exhaustive()
    }
}
