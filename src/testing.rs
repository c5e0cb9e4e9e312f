//! Test doubles for the network edges: DNS and the IRC connection.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mxbl_proto::{Message, irc_to_lower};
use parking_lot::Mutex;

use crate::config::Config;
use crate::db::Database;
use crate::irc::{Outbound, OutboundError, WhoisInfo};
use crate::moderation::{DnsLookup, Record, RecordKind, ResolveError};
use crate::state::Agent;

/// Scripted DNS. Unscripted queries fail like NXDOMAIN.
#[derive(Default)]
pub struct FakeDns {
    answers: HashMap<(String, RecordKind), Option<Vec<Record>>>,
    queries: Mutex<Vec<(String, RecordKind)>>,
}

impl FakeDns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, name: &str, kind: RecordKind, records: Vec<Record>) -> Self {
        self.answers.insert((name.to_owned(), kind), Some(records));
        self
    }

    pub fn fail(mut self, name: &str, kind: RecordKind) -> Self {
        self.answers.insert((name.to_owned(), kind), None);
        self
    }

    /// Every query made, in order.
    pub fn queries(&self) -> Vec<(String, RecordKind)> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl DnsLookup for FakeDns {
    async fn lookup(&self, name: &str, kind: RecordKind) -> Result<Vec<Record>, ResolveError> {
        self.queries.lock().push((name.to_owned(), kind));
        match self.answers.get(&(name.to_owned(), kind)) {
            Some(Some(records)) => Ok(records.clone()),
            Some(None) => Err(ResolveError::Timeout),
            None => Err(ResolveError::Lookup("no records found".into())),
        }
    }
}

type FailWhen = Box<dyn Fn(&Message) -> bool + Send + Sync>;

/// Records everything sent; answers WHOIS from a fixed table.
#[derive(Default)]
pub struct FakeOutbound {
    sent: Mutex<Vec<Message>>,
    users: Mutex<HashMap<String, WhoisInfo>>,
    fail_when: Mutex<Option<FailWhen>>,
}

impl FakeOutbound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `nick` visible to WHOIS.
    pub fn online(&self, nick: &str, user: &str, host: &str) {
        self.users.lock().insert(
            irc_to_lower(nick),
            WhoisInfo {
                nick: nick.to_owned(),
                user: user.to_owned(),
                host: host.to_owned(),
            },
        );
    }

    /// Reject sends matching `pred` with [`OutboundError::Closed`].
    pub fn fail_when(&self, pred: impl Fn(&Message) -> bool + Send + Sync + 'static) {
        *self.fail_when.lock() = Some(Box::new(pred));
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    /// Sent messages in wire form.
    pub fn lines(&self) -> Vec<String> {
        self.sent.lock().iter().map(ToString::to_string).collect()
    }
}

#[async_trait]
impl Outbound for FakeOutbound {
    async fn send(&self, msg: Message) -> Result<(), OutboundError> {
        if let Some(pred) = self.fail_when.lock().as_ref()
            && pred(&msg)
        {
            return Err(OutboundError::Closed);
        }
        self.sent.lock().push(msg);
        Ok(())
    }

    async fn whois(&self, nick: &str) -> Option<WhoisInfo> {
        self.users.lock().get(&irc_to_lower(nick)).cloned()
    }
}

/// Minimal test configuration with `extra` TOML appended.
pub fn config(extra: &str) -> Config {
    let text = format!(
        r##"
        [irc]
        server = "irc.example.net"
        nickname = "mxbl"
        log = "#mxbl-log"

        [database]
        path = ":memory:"

        {extra}
        "##
    );
    toml::from_str(&text).expect("test config parses")
}

/// An agent over an in-memory database, no DNS answers and a fake connection.
pub async fn agent(config: Config) -> (Arc<Agent>, Arc<FakeOutbound>) {
    agent_with_dns(config, FakeDns::new()).await
}

pub async fn agent_with_dns(config: Config, dns: FakeDns) -> (Arc<Agent>, Arc<FakeOutbound>) {
    let db = Database::new(":memory:").await.expect("in-memory database");
    let out = Arc::new(FakeOutbound::new());
    let agent = Agent::new(Arc::new(config), db, out.clone(), Arc::new(dns));
    (Arc::new(agent), out)
}
