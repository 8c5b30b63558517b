//! eevee-irc-connector — bridges IRC networks onto a NATS message bus.
//!
//! One long-lived client instance per configured network. Inbound channel
//! messages are normalized into bus envelopes on
//! `chat.message.incoming.irc.<network>.<channel>.<ident>`; outbound actions
//! arrive on the matching `outgoing` subjects.
//!
//! See `DESIGN.md` for architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bridge;
pub mod config;
pub mod health;
pub mod irc;
pub mod logging;
pub mod nats;
pub mod shutdown;
