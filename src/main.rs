#![allow(missing_docs)]

//! eevee-irc-connector — bridges IRC networks onto a NATS message bus.
//!
//! Stands up one client instance per configured connection, relays inbound
//! chat messages as bus envelopes, and tears everything down on SIGINT or
//! SIGTERM.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use eevee_irc_connector::config::BridgeConfig;
use eevee_irc_connector::irc::{IrcInstance, Registry};
use eevee_irc_connector::nats::NatsPublisher;
use eevee_irc_connector::shutdown::ShutdownCoordinator;
use eevee_irc_connector::{bridge, health, logging};

#[derive(Parser)]
#[command(
    name = "eevee-irc-connector",
    version,
    about = "Bridges IRC networks onto a NATS message bus"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge (default).
    Start,
    /// Validate the configuration and exit.
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Start) {
        Commands::Start => start().await,
        Commands::CheckConfig => check_config(),
    }
}

/// Validate descriptors and the NATS endpoint, then exit.
fn check_config() -> Result<()> {
    logging::init_cli();
    let config = BridgeConfig::load().context("configuration is invalid")?;
    info!(
        producer = "core",
        "configuration OK: {} connection(s)",
        config.connections.len()
    );
    Ok(())
}

/// Bring up the bus connection and every IRC instance, then wait for a
/// termination signal.
async fn start() -> Result<()> {
    // Configuration errors are fatal before anything connects.
    let config = BridgeConfig::load().context("failed to load configuration")?;
    let _logging = logging::init_production(Path::new(&config.paths.logs_dir))?;

    info!(
        producer = "core",
        "eevee-irc-connector v{} starting up",
        env!("CARGO_PKG_VERSION")
    );

    let host = config.nats.host.clone().context("NATS host missing")?;
    let token = config.nats.token.clone().context("NATS token missing")?;
    let publisher = Arc::new(NatsPublisher::new(host, token));
    publisher.connect().await;

    let registry = Arc::new(Registry::new());
    for descriptor in &config.connections {
        info!(
            producer = "ircClient",
            "setting up irc connection for {}", descriptor.name
        );
        let instance = IrcInstance::new(descriptor.clone());
        registry.insert(Arc::clone(&instance));
        bridge::spawn_relay(Arc::clone(&instance), Arc::clone(&publisher));
        instance.connect()?;
    }

    bridge::subscribe_outbound(Arc::clone(&registry), &publisher).await;
    health::spawn_health_writer(
        Arc::clone(&registry),
        PathBuf::from(&config.paths.health_file),
    );

    ShutdownCoordinator::new(registry, publisher).run().await
}
