//! DNS access for the resolution engine.

use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::rr::{RData, RecordType};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use thiserror::Error;

/// Record types the engine asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Mx,
    A,
    Aaaa,
}

impl RecordKind {
    fn record_type(self) -> RecordType {
        match self {
            RecordKind::Mx => RecordType::MX,
            RecordKind::A => RecordType::A,
            RecordKind::Aaaa => RecordType::AAAA,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordKind::Mx => "MX",
            RecordKind::A => "A",
            RecordKind::Aaaa => "AAAA",
        })
    }
}

/// One answer record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Mx { exchange: String },
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    /// Anything else the server included (CNAMEs in the chain, mostly).
    Other,
}

/// A failed lookup. The engine treats every failure as "no records".
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("lookup timed out")]
    Timeout,
    #[error("lookup failed: {0}")]
    Lookup(String),
}

/// Resolves a name to records of one kind.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn lookup(&self, name: &str, kind: RecordKind) -> Result<Vec<Record>, ResolveError>;
}

/// [`DnsLookup`] on the system resolver.
pub struct HickoryLookup {
    resolver: TokioResolver,
    lifetime: Duration,
}

impl HickoryLookup {
    /// Build from the system configuration, falling back to defaults.
    ///
    /// `timeout` is used both as the per-query timeout and as the overall
    /// lifetime of one lookup.
    pub fn new(timeout: Duration) -> Self {
        let mut builder = TokioResolver::builder_tokio().unwrap_or_else(|_| {
            TokioResolver::builder_with_config(
                ResolverConfig::default(),
                TokioConnectionProvider::default(),
            )
        });
        builder.options_mut().timeout = timeout;

        Self {
            resolver: builder.build(),
            lifetime: timeout,
        }
    }
}

#[async_trait]
impl DnsLookup for HickoryLookup {
    async fn lookup(&self, name: &str, kind: RecordKind) -> Result<Vec<Record>, ResolveError> {
        // Absolute name: no search-domain expansion.
        let fqdn = if name.ends_with('.') {
            name.to_owned()
        } else {
            format!("{name}.")
        };

        let lookup = tokio::time::timeout(
            self.lifetime,
            self.resolver.lookup(fqdn, kind.record_type()),
        )
        .await
        .map_err(|_| ResolveError::Timeout)?
        .map_err(|e| ResolveError::Lookup(e.to_string()))?;

        Ok(lookup
            .iter()
            .map(|rdata| match rdata {
                RData::MX(mx) => Record::Mx {
                    exchange: mx.exchange().to_utf8(),
                },
                RData::A(a) => Record::A(a.0),
                RData::AAAA(aaaa) => Record::Aaaa(aaaa.0),
                _ => Record::Other,
            })
            .collect())
    }
}
