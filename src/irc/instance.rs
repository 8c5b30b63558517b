//! One long-lived, stateful connection to a single IRC network.
//!
//! An [`IrcInstance`] wraps the `irc` crate client in a driver task that owns
//! the connection lifecycle: connect, register, run the post-connect join
//! sequence, relay every protocol event on a broadcast surface, and reconnect
//! per the descriptor's policy until `quit()` is requested.
//!
//! All mutations of the instance's [`Status`] ledger happen on the driver
//! task; observers read weakly consistent snapshots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use irc::client::data::Config as ClientConfig;
use irc::client::{Client, Sender};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ConnectionConfig;

use super::event::IrcEvent;
use super::joins::{sorted_joins, JoinRequest};
use super::IrcError;

/// Capacity of the per-instance event relay channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Observable connection state, mutated only by the owning instance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Status {
    /// Host we are connected (or connecting) to.
    pub remote_host: String,
    /// Channels this process has joined, in join order.
    pub channels: Vec<String>,
    /// Whether registration has completed on a live connection.
    pub connected: bool,
    /// The nick the server accepted for us.
    pub current_nick: String,
}

/// One running connection to a single IRC network.
pub struct IrcInstance {
    name: String,
    instance_uuid: Uuid,
    instance_ident: String,
    config: ConnectionConfig,
    status: RwLock<Status>,
    /// Every channel ever requested to join, with its key.
    channels: Mutex<Vec<JoinRequest>>,
    /// Joins requested before registration, flushed by the driver.
    pending_joins: Mutex<Vec<JoinRequest>>,
    events: broadcast::Sender<IrcEvent>,
    sender: RwLock<Option<Sender>>,
    quitting: AtomicBool,
    joins_run: AtomicBool,
    driver: Mutex<Option<tokio::task::JoinHandle<()>>>,
    weak: Weak<IrcInstance>,
}

impl IrcInstance {
    /// Create an instance from its descriptor. Does not connect.
    pub fn new(config: ConnectionConfig) -> Arc<Self> {
        let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new_cyclic(|weak| Self {
            instance_ident: format!("{hostname}-{}", config.name),
            name: config.name.clone(),
            instance_uuid: Uuid::new_v4(),
            config,
            status: RwLock::new(Status::default()),
            channels: Mutex::new(Vec::new()),
            pending_joins: Mutex::new(Vec::new()),
            events,
            sender: RwLock::new(None),
            quitting: AtomicBool::new(false),
            joins_run: AtomicBool::new(false),
            driver: Mutex::new(None),
            weak: weak.clone(),
        })
    }

    /// The network name from the descriptor.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process-unique correlation id for log attribution.
    pub fn instance_uuid(&self) -> Uuid {
        self.instance_uuid
    }

    /// `<hostname>-<name>`, stable across the process lifetime.
    pub fn instance_ident(&self) -> &str {
        &self.instance_ident
    }

    /// The configured nick this instance identifies as.
    pub fn nick(&self) -> &str {
        &self.config.ident.nick
    }

    /// The configured default QUIT message.
    pub fn quit_message(&self) -> &str {
        &self.config.ident.quit_msg
    }

    /// Snapshot of the status ledger. Weakly consistent across instances.
    pub fn status(&self) -> Status {
        read(&self.status).clone()
    }

    /// Every channel this instance has been asked to join, in request order.
    pub fn requested_channels(&self) -> Vec<JoinRequest> {
        lock(&self.channels).clone()
    }

    /// Whether `quit()` has been requested.
    pub fn is_quitting(&self) -> bool {
        self.quitting.load(Ordering::SeqCst)
    }

    /// Subscribe to the instance's relayed event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<IrcEvent> {
        self.events.subscribe()
    }

    /// Start the connection driver.
    ///
    /// Non-blocking: completion is signalled by a [`IrcEvent::Registered`]
    /// event on the relay. At most one driver runs per instance; calling
    /// again while one is live is an error.
    pub fn connect(&self) -> Result<(), IrcError> {
        let mut driver = lock(&self.driver);
        if driver.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(IrcError::AlreadyConnecting(self.name.clone()));
        }
        info!(
            producer = "ircClient",
            instance_uuid = %self.instance_uuid,
            "client connecting to {}",
            self.config.irc.host
        );
        let Some(this) = self.weak.upgrade() else {
            return Ok(());
        };
        *driver = Some(tokio::spawn(this.run()));
        Ok(())
    }

    /// Request joining a channel.
    ///
    /// Appends to the instance's requested-channel list and delegates to the
    /// live connection; before registration the request is queued and flushed
    /// once the server confirms us.
    pub fn join(&self, channel: &str, key: &str) {
        let request = JoinRequest {
            channel: channel.to_string(),
            key: key.to_string(),
        };
        lock(&self.channels).push(request.clone());
        self.send_join(&request);
    }

    /// Request a graceful disconnect.
    ///
    /// The reason defaults to the configured quit message. Idempotent:
    /// calling again, or after the connection is already closed, is a no-op.
    pub fn quit(&self, message: Option<&str>) {
        if self.quitting.swap(true, Ordering::SeqCst) {
            debug!(
                producer = "ircClient",
                instance_uuid = %self.instance_uuid,
                "quit already requested"
            );
            return;
        }
        let reason = message.unwrap_or(&self.config.ident.quit_msg).to_string();
        info!(
            producer = "ircClient",
            instance_uuid = %self.instance_uuid,
            "quitting: {reason}"
        );
        if let Some(sender) = read(&self.sender).clone() {
            if let Err(e) = sender.send_quit(reason) {
                debug!(
                    producer = "ircClient",
                    instance_uuid = %self.instance_uuid,
                    "QUIT not sent: {e}"
                );
            }
        }
    }

    /// Send a PRIVMSG to a channel or nick.
    ///
    /// Best-effort: when no connection is live the message is dropped with a
    /// warning.
    pub fn send(&self, target: &str, text: &str) {
        match read(&self.sender).clone() {
            Some(sender) => {
                if let Err(e) = sender.send_privmsg(target, text) {
                    warn!(
                        producer = "ircClient",
                        instance_uuid = %self.instance_uuid,
                        "failed to send message to {target}: {e}"
                    );
                }
            }
            None => warn!(
                producer = "ircClient",
                instance_uuid = %self.instance_uuid,
                "not connected, dropping outbound message to {target}"
            ),
        }
    }

    // ── Driver ──────────────────────────────────────────────────

    /// Connection loop: connect, pump the stream, reconnect per policy.
    async fn run(self: Arc<Self>) {
        let mut attempt: u32 = 0;
        loop {
            if self.is_quitting() {
                break;
            }
            // Optimistic: record where we are about to connect.
            write(&self.status).remote_host = self.config.irc.host.clone();

            match Client::from_config(self.client_config()).await {
                Ok(mut client) => {
                    attempt = 0;
                    if let Err(e) = self.drive(&mut client).await {
                        warn!(
                            producer = "ircClient",
                            instance_uuid = %self.instance_uuid,
                            "connection lost: {e}"
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        producer = "ircClient",
                        instance_uuid = %self.instance_uuid,
                        "connection attempt to {} failed: {e}",
                        self.config.irc.host
                    );
                }
            }

            *write(&self.sender) = None;
            write(&self.status).connected = false;

            if self.is_quitting() {
                self.emit(IrcEvent::Disconnected {
                    reason: "quit requested".to_string(),
                });
                break;
            }
            self.emit(IrcEvent::Disconnected {
                reason: "connection closed".to_string(),
            });

            if !self.config.irc.auto_reconnect {
                break;
            }
            attempt = attempt.saturating_add(1);
            if attempt > self.config.irc.auto_reconnect_max_retries {
                error!(
                    producer = "ircClient",
                    instance_uuid = %self.instance_uuid,
                    "giving up on {} after {} reconnect attempts",
                    self.config.irc.host,
                    self.config.irc.auto_reconnect_max_retries
                );
                break;
            }
            let wait = self.config.irc.auto_reconnect_wait;
            info!(
                producer = "ircClient",
                instance_uuid = %self.instance_uuid,
                "reconnecting to {} in {wait}ms (attempt {attempt})",
                self.config.irc.host
            );
            self.emit(IrcEvent::Reconnecting { attempt, wait });
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }
        debug!(
            producer = "ircClient",
            instance_uuid = %self.instance_uuid,
            "driver finished"
        );
    }

    /// Pump one live connection until its stream ends.
    async fn drive(&self, client: &mut Client) -> Result<(), irc::error::Error> {
        client.identify()?;
        let mut stream = client.stream()?;
        *write(&self.sender) = Some(client.sender());
        self.emit(IrcEvent::Connected);

        while let Some(message) = stream.next().await.transpose()? {
            self.handle_message(message);
        }
        Ok(())
    }

    /// Convert, apply ledger effects, and relay one protocol message.
    fn handle_message(&self, message: irc::proto::Message) {
        let event = IrcEvent::from_message(&message);
        match &event {
            IrcEvent::Registered { nick } => {
                info!(
                    producer = "ircClient",
                    instance_uuid = %self.instance_uuid,
                    "client connected to {} as {nick}",
                    self.config.irc.host
                );
                {
                    let mut status = write(&self.status);
                    status.connected = true;
                    status.remote_host = self.config.irc.host.clone();
                    status.current_nick = nick.clone();
                }
                self.schedule_joins();
            }
            IrcEvent::Joined { channel, nick } => {
                if *nick == read(&self.status).current_nick {
                    info!(
                        producer = "ircClient",
                        instance_uuid = %self.instance_uuid,
                        "joined channel {channel}"
                    );
                    write(&self.status).channels.push(channel.clone());
                }
            }
            IrcEvent::Kicked { channel, nick, by, .. } => {
                if *nick == read(&self.status).current_nick {
                    warn!(
                        producer = "ircClient",
                        instance_uuid = %self.instance_uuid,
                        "kicked from {channel} by {by}"
                    );
                    if self.config.irc.auto_rejoin {
                        self.schedule_rejoin(channel.clone());
                    }
                }
            }
            _ => {}
        }
        self.emit(event);
    }

    /// Flush queued joins, then run the descriptor's join sequence after the
    /// settle delay.
    fn schedule_joins(&self) {
        let queued: Vec<JoinRequest> = std::mem::take(&mut *lock(&self.pending_joins));
        let first_run = !self.joins_run.swap(true, Ordering::SeqCst);
        let run_sequence = first_run || self.config.irc.rejoin_on_reconnect;
        let joins = sorted_joins(&self.config.post_connect.join);

        let Some(this) = self.weak.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            for request in &queued {
                this.send_join(request);
            }
            if !run_sequence || joins.is_empty() {
                return;
            }
            // Settle delay is an anti-flood margin, not a per-join ack wait.
            tokio::time::sleep(Duration::from_millis(this.config.irc.settle_delay)).await;
            info!(
                producer = "ircClient",
                instance_uuid = %this.instance_uuid,
                "found {} channels to join",
                joins.len()
            );
            for request in &joins {
                info!(
                    producer = "ircClient",
                    instance_uuid = %this.instance_uuid,
                    "joining channel {}",
                    request.channel
                );
                this.join(&request.channel, &request.key);
            }
        });
    }

    /// Re-join a channel we were kicked from, per the rejoin policy.
    fn schedule_rejoin(&self, channel: String) {
        let key = lock(&self.channels)
            .iter()
            .rev()
            .find(|request| request.channel == channel)
            .map(|request| request.key.clone())
            .unwrap_or_default();
        let request = JoinRequest {
            channel: channel.clone(),
            key,
        };

        let Some(this) = self.weak.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            let wait = Duration::from_millis(this.config.irc.auto_rejoin_wait);
            let mut events = this.subscribe();
            for attempt in 1..=this.config.irc.auto_rejoin_max_retries {
                tokio::time::sleep(wait).await;
                if this.is_quitting() {
                    return;
                }
                info!(
                    producer = "ircClient",
                    instance_uuid = %this.instance_uuid,
                    "re-joining {} after kick (attempt {attempt})",
                    request.channel
                );
                this.send_join(&request);

                // Confirmed when our own join for this channel comes back.
                let confirmed = tokio::time::timeout(wait, async {
                    loop {
                        match events.recv().await {
                            Ok(IrcEvent::Joined { channel, nick })
                                if channel == request.channel
                                    && nick == read(&this.status).current_nick =>
                            {
                                return true;
                            }
                            Ok(_) => {}
                            Err(_) => return false,
                        }
                    }
                })
                .await;
                if matches!(confirmed, Ok(true)) {
                    return;
                }
            }
            warn!(
                producer = "ircClient",
                instance_uuid = %this.instance_uuid,
                "giving up re-joining {}",
                request.channel
            );
        });
    }

    /// Issue one JOIN on the live connection, or queue it until registration.
    fn send_join(&self, request: &JoinRequest) {
        match read(&self.sender).clone() {
            Some(sender) => {
                let result = if request.key.is_empty() {
                    sender.send_join(&request.channel)
                } else {
                    sender.send_join_with_keys(&request.channel, &request.key)
                };
                if let Err(e) = result {
                    warn!(
                        producer = "ircClient",
                        instance_uuid = %self.instance_uuid,
                        "failed to send JOIN for {}: {e}",
                        request.channel
                    );
                }
            }
            None => {
                debug!(
                    producer = "ircClient",
                    instance_uuid = %self.instance_uuid,
                    "not registered yet, queueing join for {}",
                    request.channel
                );
                lock(&self.pending_joins).push(request.clone());
            }
        }
    }

    /// Relay one event. Best-effort: an error only means nobody is listening.
    fn emit(&self, event: IrcEvent) {
        let _ = self.events.send(event);
    }

    /// Build the protocol client's configuration from the descriptor.
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            nickname: Some(self.config.ident.nick.clone()),
            username: Some(self.config.ident.username.clone()),
            realname: Some(self.config.ident.gecos.clone()),
            server: Some(self.config.irc.host.clone()),
            port: Some(self.config.irc.port),
            use_tls: Some(self.config.irc.ssl),
            version: Some(self.config.ident.version.clone()),
            ping_time: Some(self.config.irc.ping_interval),
            ping_timeout: Some(self.config.irc.ping_timeout),
            ..ClientConfig::default()
        }
    }
}

impl std::fmt::Debug for IrcInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrcInstance")
            .field("name", &self.name)
            .field("instance_uuid", &self.instance_uuid)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Lock a mutex, recovering from poisoning.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read-lock, recovering from poisoning.
fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Write-lock, recovering from poisoning.
fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
