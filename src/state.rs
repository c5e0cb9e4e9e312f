//! The Agent - shared state for one connection session.
//!
//! Handlers and commands receive the agent by reference. Everything mutable
//! in here is either behind a short-lived lock or atomic; nothing is held
//! across an `.await`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mxbl_proto::irc_eq;
use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::db::Database;
use crate::irc::{Outbound, OutboundError};
use crate::moderation::{DnsLookup, DomainChecker};

/// Shared state container for a session.
pub struct Agent {
    /// Daemon configuration.
    pub config: Arc<Config>,

    /// Blocklist storage.
    pub db: Database,

    /// Connection to the server.
    pub outbound: Arc<dyn Outbound>,

    /// Domain resolution engine.
    pub checker: DomainChecker,

    /// Our current nickname, as the server last confirmed it.
    nickname: RwLock<String>,

    /// Set once RPL_WELCOME arrives.
    registered: AtomicBool,

    /// Set once the "connected to" line has been logged.
    announced: AtomicBool,

    /// Capabilities offered so far during a multi-line `CAP LS`.
    offered_caps: Mutex<Vec<String>>,
}

impl Agent {
    pub fn new(
        config: Arc<Config>,
        db: Database,
        outbound: Arc<dyn Outbound>,
        dns: Arc<dyn DnsLookup>,
    ) -> Self {
        let checker = DomainChecker::new(db.clone(), dns, config.settings.max_lookups);
        let nickname = RwLock::new(config.irc.nickname.clone());

        Self {
            config,
            db,
            outbound,
            checker,
            nickname,
            registered: AtomicBool::new(false),
            announced: AtomicBool::new(false),
            offered_caps: Mutex::new(Vec::new()),
        }
    }

    pub fn nickname(&self) -> String {
        self.nickname.read().clone()
    }

    pub fn set_nickname(&self, nick: &str) {
        *self.nickname.write() = nick.to_owned();
    }

    /// Whether `nick` is us (RFC 1459 case-insensitive).
    pub fn is_me(&self, nick: &str) -> bool {
        irc_eq(&self.nickname.read(), nick)
    }

    /// Nick of the account-services bot.
    pub fn services(&self) -> &str {
        &self.config.settings.services
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    pub fn mark_registered(&self) {
        self.registered.store(true, Ordering::Release);
    }

    /// Returns true exactly once per session.
    pub fn announce_once(&self) -> bool {
        !self.announced.swap(true, Ordering::AcqRel)
    }

    /// Accumulate one `CAP LS` line.
    pub fn offer_caps<'a>(&self, caps: impl IntoIterator<Item = &'a str>) {
        self.offered_caps
            .lock()
            .extend(caps.into_iter().map(str::to_owned));
    }

    /// Take everything offered so far, leaving the list empty.
    pub fn take_offered_caps(&self) -> Vec<String> {
        std::mem::take(&mut *self.offered_caps.lock())
    }

    /// Send a line to the audit log channel, if one is configured.
    pub async fn log(&self, text: &str) -> Result<(), OutboundError> {
        match &self.config.irc.log {
            Some(channel) => self.outbound.privmsg(channel, text).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{agent, config};

    #[tokio::test]
    async fn nickname_tracking_is_case_insensitive() {
        let (agent, _out) = agent(config("")).await;
        assert!(agent.is_me("MXBL"));
        agent.set_nickname("mxbl_");
        assert!(!agent.is_me("mxbl"));
        assert!(agent.is_me("Mxbl_"));
    }

    #[tokio::test]
    async fn announce_fires_once() {
        let (agent, _out) = agent(config("")).await;
        assert!(agent.announce_once());
        assert!(!agent.announce_once());
    }

    #[tokio::test]
    async fn log_goes_to_configured_channel() {
        let (agent, out) = agent(config("")).await;
        agent.log("hello").await.unwrap();
        assert_eq!(out.lines(), vec!["PRIVMSG #mxbl-log hello"]);
    }

    #[tokio::test]
    async fn log_without_channel_is_silent() {
        let mut cfg = config("");
        cfg.irc.log = None;
        let (agent, out) = agent(cfg).await;
        agent.log("hello").await.unwrap();
        assert!(out.lines().is_empty());
    }
}
