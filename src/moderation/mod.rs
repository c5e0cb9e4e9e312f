//! Blocklist enforcement: domain resolution, matching and the actions taken
//! against offending accounts.

mod engine;
mod enforce;
mod resolver;

pub use engine::DomainChecker;
pub use enforce::enforce;
pub use resolver::{DnsLookup, HickoryLookup, Record, RecordKind, ResolveError};
