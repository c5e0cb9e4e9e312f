//! Client side of the IRC connection.
//!
//! The rest of the daemon only sees the [`Outbound`] trait: send a message,
//! or ask who is behind a nickname. [`connection`] provides the real
//! implementation over TCP/TLS.

mod codec;
mod connection;
mod whois;

pub use connection::connect;

use async_trait::async_trait;
use mxbl_proto::Message;
use thiserror::Error;

/// Failure to hand a message to the connection.
#[derive(Debug, Error)]
pub enum OutboundError {
    #[error("connection closed")]
    Closed,
}

/// Identity of a connected user, as reported by WHOIS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoisInfo {
    pub nick: String,
    pub user: String,
    pub host: String,
}

impl WhoisInfo {
    /// `nick!user@host`.
    pub fn hostmask(&self) -> String {
        format!("{}!{}@{}", self.nick, self.user, self.host)
    }
}

/// Outbound half of the protocol connection.
#[async_trait]
pub trait Outbound: Send + Sync {
    /// Queue a message for the server.
    async fn send(&self, msg: Message) -> Result<(), OutboundError>;

    /// Correlated WHOIS lookup. `None` if the user is not online or the
    /// lookup timed out.
    async fn whois(&self, nick: &str) -> Option<WhoisInfo>;

    async fn privmsg(&self, target: &str, text: &str) -> Result<(), OutboundError> {
        self.send(Message::privmsg(target, text)).await
    }

    async fn notice(&self, target: &str, text: &str) -> Result<(), OutboundError> {
        self.send(Message::notice(target, text)).await
    }
}
