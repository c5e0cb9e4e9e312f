//! Domain resolution and blocklist matching.
//!
//! A domain is checked literally first. On a miss its MX, A and AAAA records
//! are walked breadth-first; MX targets jump the queue, and only addresses
//! are matched against the list. The first match ends the walk.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, warn};

use super::resolver::{DnsLookup, Record, RecordKind};
use crate::db::{Database, DbError, MxblEntry};

/// A blocklist hit for a checked domain.
#[derive(Debug, Clone)]
pub struct Match {
    pub entry: MxblEntry,
    /// `mxbl #<id> - <reason>`, used in every directive and log line.
    pub reason: String,
}

impl From<MxblEntry> for Match {
    fn from(entry: MxblEntry) -> Self {
        let reason = entry.full_reason();
        Self { entry, reason }
    }
}

/// Checks domains against the active blocklist, following DNS.
pub struct DomainChecker {
    db: Database,
    dns: Arc<dyn DnsLookup>,
    max_lookups: usize,
}

impl DomainChecker {
    pub fn new(db: Database, dns: Arc<dyn DnsLookup>, max_lookups: usize) -> Self {
        Self {
            db,
            dns,
            max_lookups,
        }
    }

    /// Find the active entry matching `domain` or any address it resolves to.
    ///
    /// DNS failures count as empty answers. Storage failures propagate.
    pub async fn check(&self, domain: &str) -> Result<Option<Match>, DbError> {
        let repo = self.db.mxbl();

        if let Some(entry) = repo.match_active(domain).await? {
            debug!(id = entry.id, "Domain matched directly");
            return Ok(Some(entry.into()));
        }

        let mut queue: VecDeque<(String, RecordKind)> =
            [RecordKind::Mx, RecordKind::A, RecordKind::Aaaa]
                .into_iter()
                .map(|kind| (domain.to_owned(), kind))
                .collect();
        let mut visited = HashSet::new();
        let mut lookups = 0usize;

        while let Some((name, kind)) = queue.pop_front() {
            if !visited.insert((name.clone(), kind)) {
                continue;
            }
            if lookups >= self.max_lookups {
                warn!(lookups, queued = queue.len() + 1, "Lookup budget exhausted, giving up");
                return Ok(None);
            }
            lookups += 1;

            let records = match self.dns.lookup(&name, kind).await {
                Ok(records) => records,
                Err(e) => {
                    debug!(name = %name, kind = %kind, error = %e, "Lookup failed");
                    continue;
                }
            };

            for record in records {
                let address = match record {
                    Record::Mx { exchange } => {
                        let exchange = exchange.trim_end_matches('.');
                        if !exchange.is_empty() {
                            // Ends up as A, AAAA at the head of the queue.
                            queue.push_front((exchange.to_owned(), RecordKind::Aaaa));
                            queue.push_front((exchange.to_owned(), RecordKind::A));
                        }
                        continue;
                    }
                    Record::A(ip) => ip.to_string(),
                    Record::Aaaa(ip) => ip.to_string(),
                    Record::Other => continue,
                };

                if let Some(entry) = repo.match_active(&address).await? {
                    debug!(
                        id = entry.id,
                        name = %name,
                        address = %address,
                        "Resolved address matched"
                    );
                    return Ok(Some(entry.into()));
                }
            }
        }

        debug!(lookups, "No match");
        Ok(None)
    }
}
