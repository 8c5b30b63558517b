//! IRC side of the connector: per-network client instances, the closed
//! event catalogue they relay, the post-connect join scheduler, and the
//! process-wide instance registry.
//!
//! Wire-level protocol mechanics (framing, TLS, registration) come from the
//! `irc` crate; this module owns each connection's lifecycle around it.

pub mod event;
pub mod instance;
pub mod joins;
pub mod registry;

pub use event::{IrcEvent, MessageEvent};
pub use instance::{IrcInstance, Status};
pub use registry::Registry;

/// Errors from the IRC side.
#[derive(Debug, thiserror::Error)]
pub enum IrcError {
    /// The underlying protocol client failed.
    #[error("connection error: {0}")]
    Connection(#[from] irc::error::Error),

    /// `connect()` was called while a connection attempt is outstanding.
    #[error("instance {0} is already connecting")]
    AlreadyConnecting(String),
}
