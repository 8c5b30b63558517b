//! The closed catalogue of events an instance relays.
//!
//! Every protocol message becomes exactly one [`IrcEvent`]; anything outside
//! the enumerated catalogue passes through as [`IrcEvent::Unrecognized`] with
//! the raw line preserved, so consumers stay forward compatible with server
//! extensions without this layer reinterpreting them.

use irc::proto::{Command, Message, Prefix, Response};
use serde::Serialize;

/// An inbound chat message (PRIVMSG, NOTICE, or CTCP ACTION).
///
/// Field names follow the bus payload this eventually becomes part of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageEvent {
    /// Channel or nick the message was addressed to.
    pub target: String,
    /// Sender nickname.
    pub nick: String,
    /// Sender username (ident).
    pub ident: String,
    /// Sender hostname.
    pub hostname: String,
    /// Message text.
    pub message: String,
}

/// One relayed protocol event.
///
/// `Connected`, `Registered`, `Reconnecting`, and `Disconnected` are produced
/// by the instance's own lifecycle; everything else is converted one-to-one
/// from inbound protocol messages in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcEvent {
    /// Transport established; registration in progress.
    Connected,
    /// Registration confirmed (RPL_WELCOME) under the given nick.
    Registered {
        /// Nick the server accepted.
        nick: String,
    },
    /// A reconnect attempt is scheduled.
    Reconnecting {
        /// 1-based attempt counter since the last successful connection.
        attempt: u32,
        /// Wait before the attempt, milliseconds.
        wait: u64,
    },
    /// The connection is gone.
    Disconnected {
        /// Human-readable reason.
        reason: String,
    },

    /// Someone joined a channel.
    Joined {
        /// Channel that was joined.
        channel: String,
        /// Who joined (possibly us).
        nick: String,
    },
    /// Someone left a channel.
    Parted {
        /// Channel that was left.
        channel: String,
        /// Who left.
        nick: String,
        /// Part message, if given.
        reason: Option<String>,
    },
    /// Someone was kicked from a channel.
    Kicked {
        /// Channel the kick happened in.
        channel: String,
        /// Who was kicked (possibly us).
        nick: String,
        /// Who issued the kick.
        by: String,
        /// Kick reason, if given.
        reason: Option<String>,
    },
    /// Someone quit the network.
    UserQuit {
        /// Who quit.
        nick: String,
        /// Quit message, if given.
        reason: Option<String>,
    },
    /// We were invited to a channel.
    Invited {
        /// Channel we were invited to.
        channel: String,
        /// Who invited us.
        by: String,
    },
    /// A channel topic was set or cleared.
    Topic {
        /// Channel the topic belongs to.
        channel: String,
        /// New topic; `None` clears it.
        topic: Option<String>,
    },

    /// A PRIVMSG.
    Message(MessageEvent),
    /// A NOTICE.
    Notice(MessageEvent),
    /// A CTCP ACTION (`/me`).
    Action(MessageEvent),

    /// Someone changed nick.
    NickChanged {
        /// Previous nick.
        old: String,
        /// New nick.
        new: String,
    },
    /// One MOTD line.
    Motd {
        /// The line, without numeric decoration.
        line: String,
    },

    /// Capability negotiation traffic.
    Cap {
        /// Subcommand (LS, ACK, NAK, ...).
        subcommand: String,
        /// Capability list, when present.
        caps: String,
    },
    /// SASL authentication succeeded (RPL_LOGGEDIN).
    LoggedIn {
        /// Account we are logged in as.
        account: String,
    },
    /// SASL session ended (RPL_LOGGEDOUT).
    LoggedOut,
    /// SASL authentication failed (ERR_SASLFAIL).
    SaslFailed {
        /// Server-provided reason.
        reason: String,
    },

    /// Anything outside the catalogue, relayed verbatim.
    Unrecognized {
        /// The raw protocol line.
        raw: String,
    },
}

impl IrcEvent {
    /// Convert one protocol message into its relayed event.
    pub fn from_message(message: &Message) -> IrcEvent {
        let (nick, ident, hostname) = source(&message.prefix);
        match &message.command {
            Command::PRIVMSG(target, text) => match ctcp_action(text) {
                Some(action) => IrcEvent::Action(MessageEvent {
                    target: target.clone(),
                    nick,
                    ident,
                    hostname,
                    message: action.to_string(),
                }),
                None => IrcEvent::Message(MessageEvent {
                    target: target.clone(),
                    nick,
                    ident,
                    hostname,
                    message: text.clone(),
                }),
            },
            Command::NOTICE(target, text) => IrcEvent::Notice(MessageEvent {
                target: target.clone(),
                nick,
                ident,
                hostname,
                message: text.clone(),
            }),
            Command::JOIN(channel, _, _) => IrcEvent::Joined {
                channel: channel.clone(),
                nick,
            },
            Command::PART(channel, reason) => IrcEvent::Parted {
                channel: channel.clone(),
                nick,
                reason: reason.clone(),
            },
            Command::KICK(channel, kicked, reason) => IrcEvent::Kicked {
                channel: channel.clone(),
                nick: kicked.clone(),
                by: nick,
                reason: reason.clone(),
            },
            Command::QUIT(reason) => IrcEvent::UserQuit {
                nick,
                reason: reason.clone(),
            },
            Command::INVITE(_, channel) => IrcEvent::Invited {
                channel: channel.clone(),
                by: nick,
            },
            Command::TOPIC(channel, topic) => IrcEvent::Topic {
                channel: channel.clone(),
                topic: topic.clone(),
            },
            Command::NICK(new) => IrcEvent::NickChanged {
                old: nick,
                new: new.clone(),
            },
            Command::CAP(_, subcommand, _, caps) => IrcEvent::Cap {
                subcommand: format!("{subcommand:?}"),
                caps: caps.clone().unwrap_or_default(),
            },
            Command::Response(Response::RPL_WELCOME, args) => IrcEvent::Registered {
                nick: args.first().cloned().unwrap_or_default(),
            },
            Command::Response(Response::RPL_MOTD, args) => IrcEvent::Motd {
                line: args.last().cloned().unwrap_or_default(),
            },
            Command::Response(Response::RPL_LOGGEDIN, args) => IrcEvent::LoggedIn {
                account: args.get(2).cloned().unwrap_or_default(),
            },
            Command::Response(Response::RPL_LOGGEDOUT, _) => IrcEvent::LoggedOut,
            Command::Response(Response::ERR_SASLFAIL, args) => IrcEvent::SaslFailed {
                reason: args.last().cloned().unwrap_or_default(),
            },
            _ => IrcEvent::Unrecognized {
                raw: message.to_string().trim_end().to_string(),
            },
        }
    }
}

/// Split a message prefix into (nick, ident, hostname).
///
/// Server-originated messages carry the server name in the nick slot.
fn source(prefix: &Option<Prefix>) -> (String, String, String) {
    match prefix {
        Some(Prefix::Nickname(nick, user, host)) => (nick.clone(), user.clone(), host.clone()),
        Some(Prefix::ServerName(server)) => (server.clone(), String::new(), String::new()),
        None => (String::new(), String::new(), String::new()),
    }
}

/// Extract the inner text of a CTCP ACTION, if this is one.
fn ctcp_action(text: &str) -> Option<&str> {
    text.strip_prefix('\u{1}')?
        .strip_suffix('\u{1}')?
        .strip_prefix("ACTION ")
}
