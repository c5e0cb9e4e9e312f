//! # mxbl-proto
//!
//! The IRC line model shared by the mxbld daemon.
//!
//! Only the parts of the protocol the daemon actually touches live here:
//! parsing a received line into a [`Message`], serializing an outgoing one,
//! IRCv3 tag values, message prefixes and RFC 1459 case-mapping.
//!
//! ```rust
//! use mxbl_proto::Message;
//!
//! let msg: Message = "@solanum.chat/oper=root :alice!a@host PRIVMSG bot :LIST 2"
//!     .parse()
//!     .expect("valid line");
//! assert_eq!(msg.command, "PRIVMSG");
//! assert_eq!(msg.tag_value("solanum.chat/oper"), Some("root"));
//! assert_eq!(msg.source_nickname(), Some("alice"));
//!
//! let reply = Message::notice("alice", "added mxbl entry #1");
//! assert_eq!(reply.to_string(), "NOTICE alice :added mxbl entry #1");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod error;
pub mod message;
pub mod prefix;
pub mod response;

pub use casemap::{irc_eq, irc_lower_char, irc_to_lower};
pub use error::MessageParseError;
pub use message::{Message, Tag};
pub use prefix::Prefix;

/// Whether `target` names a channel rather than a nickname.
pub fn is_channel_name(target: &str) -> bool {
    target.starts_with(['#', '&', '+', '!'])
}
