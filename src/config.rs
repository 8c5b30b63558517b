//! Configuration loading for the connector.
//!
//! Connection descriptors come from a TOML file at
//! `$IRC_CONNECTIONS_CONFIG_FILE` (default `./connections.toml`).
//! NATS endpoint settings may live in the same file under `[nats]`;
//! the `NATS_HOST` / `NATS_TOKEN` environment variables override them.
//!
//! Precedence: env vars > config file > defaults. Missing required values
//! and malformed descriptors are fatal before any connection is attempted.

use std::path::PathBuf;

use serde::Deserialize;

/// Configuration errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file did not parse as TOML.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required value is missing.
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    /// A descriptor failed validation.
    #[error("invalid connection descriptor {name:?}: {reason}")]
    InvalidDescriptor {
        /// The descriptor's `name` field (possibly empty).
        name: String,
        /// Human-readable validation failure.
        reason: &'static str,
    },
}

// ── Top-level config ────────────────────────────────────────────

/// Top-level connector configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// NATS endpoint settings (`[nats]`).
    pub nats: NatsConfig,
    /// Filesystem paths (`[paths]`).
    pub paths: PathsConfig,
    /// One descriptor per IRC network (`[[connections]]`).
    pub connections: Vec<ConnectionConfig>,
}

impl BridgeConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// The file path comes from `$IRC_CONNECTIONS_CONFIG_FILE` or defaults to
    /// `./connections.toml`. The file must exist, parse, and contain at least
    /// one valid connection descriptor.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load from the TOML file only, no env overrides.
    fn load_from_file() -> Result<Self, ConfigError> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        tracing::info!(producer = "core", path = %path.display(), "config loaded");
        let config: BridgeConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the config file path using a custom env resolver (for testing).
    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("IRC_CONNECTIONS_CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("connections.toml"))
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability.
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("NATS_HOST") {
            self.nats.host = Some(v);
        }
        if let Some(v) = env("NATS_TOKEN") {
            self.nats.token = Some(v);
        }
        if let Some(v) = env("EEVEE_LOGS_DIR") {
            self.paths.logs_dir = v;
        }
        if let Some(v) = env("EEVEE_HEALTH_FILE") {
            self.paths.health_file = v;
        }
    }

    /// Reject configurations the connector must not start with.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.nats.host.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Missing("NATS_HOST (or [nats] host)"));
        }
        if self.nats.token.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Missing("NATS_TOKEN (or [nats] token)"));
        }
        if self.connections.is_empty() {
            return Err(ConfigError::Missing("[[connections]] (at least one)"));
        }
        for conn in &self.connections {
            if conn.name.is_empty() {
                return Err(ConfigError::InvalidDescriptor {
                    name: conn.name.clone(),
                    reason: "name must not be empty",
                });
            }
            for action in &conn.post_connect.join {
                if action.channel.is_empty() {
                    return Err(ConfigError::InvalidDescriptor {
                        name: conn.name.clone(),
                        reason: "join action channel must not be empty",
                    });
                }
            }
        }
        Ok(())
    }

    /// Parse a TOML string into config (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = toml::from_str(toml_str)?;
        Ok(config)
    }
}

// ── NATS config ─────────────────────────────────────────────────

/// NATS endpoint settings (`[nats]`).
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// Server URL, e.g. `nats://127.0.0.1:4222`.
    pub host: Option<String>,
    /// Authentication token.
    pub token: Option<String>,
}

impl std::fmt::Debug for NatsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsConfig")
            .field("host", &self.host)
            .field("token", &self.token.as_ref().map(|_| "__REDACTED__"))
            .finish()
    }
}

// ── Paths config ────────────────────────────────────────────────

/// Filesystem paths (`[paths]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory for rotated JSON log files.
    pub logs_dir: String,
    /// Where the periodic health snapshot is written.
    pub health_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            logs_dir: "logs".to_string(),
            health_file: "health.json".to_string(),
        }
    }
}

// ── Connection descriptors ──────────────────────────────────────

/// Static configuration for one IRC network connection.
///
/// Immutable after load; handed to exactly one client instance.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Stable network name, e.g. `"libera"`. Appears in bus subjects.
    pub name: String,
    /// Identity block (`[connections.ident]`).
    pub ident: IdentityConfig,
    /// Connection block (`[connections.irc]`).
    pub irc: IrcConnectionConfig,
    /// Post-connect actions (`[connections.post_connect]`).
    pub post_connect: PostConnectConfig,
}

/// Identity settings for one connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// IRC nickname.
    pub nick: String,
    /// IRC username (ident).
    pub username: String,
    /// Realname / gecos field.
    pub gecos: String,
    /// CTCP VERSION reply. Defaults to the connector's own version.
    pub version: String,
    /// Default QUIT message.
    pub quit_msg: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            nick: "eevee".to_string(),
            username: "eevee".to_string(),
            gecos: "eevee.bot".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            quit_msg: "eevee.bot signing off".to_string(),
        }
    }
}

/// Endpoint and lifecycle-policy settings for one connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IrcConnectionConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Connect over TLS.
    pub ssl: bool,
    /// Client-to-server PING interval, seconds.
    pub ping_interval: u32,
    /// Inactivity timeout before the connection is considered dead, seconds.
    pub ping_timeout: u32,
    /// Reconnect automatically after a drop.
    pub auto_reconnect: bool,
    /// Give up after this many consecutive failed attempts.
    pub auto_reconnect_max_retries: u32,
    /// Wait between reconnect attempts, milliseconds.
    pub auto_reconnect_wait: u64,
    /// Re-join a channel after being kicked.
    pub auto_rejoin: bool,
    /// Give up re-joining after this many attempts per kick.
    pub auto_rejoin_max_retries: u32,
    /// Wait before each re-join attempt, milliseconds.
    pub auto_rejoin_wait: u64,
    /// Anti-flood margin between registration and the first join,
    /// milliseconds.
    pub settle_delay: u64,
    /// Run the post-connect join sequence again after every reconnect,
    /// not only the first registration.
    pub rejoin_on_reconnect: bool,
}

impl Default for IrcConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6667,
            ssl: false,
            ping_interval: 30,
            ping_timeout: 120,
            auto_reconnect: true,
            auto_reconnect_max_retries: 10,
            auto_reconnect_wait: 5000,
            auto_rejoin: true,
            auto_rejoin_max_retries: 5,
            auto_rejoin_wait: 5000,
            settle_delay: 2500,
            rejoin_on_reconnect: true,
        }
    }
}

/// Actions to run once a connection has registered.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostConnectConfig {
    /// Channels to join, ordered by `sequence`.
    pub join: Vec<JoinAction>,
}

/// One channel-join action.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinAction {
    /// Channel name, e.g. `"#eevee"`.
    pub channel: String,
    /// Channel key, if the channel requires one.
    #[serde(default)]
    pub key: Option<String>,
    /// Ordering key; lower joins first. Ties keep file order.
    #[serde(default)]
    pub sequence: i64,
}

// ── Tests ───────────────────────────────────────────────────────
