//! Standardized span constructors.
//!
//! Every inbound event, administrative command and domain check runs inside
//! one of these spans so log lines carry the event token, command name or
//! domain they belong to.

use tracing::{Span, debug_span, info_span};

/// Span for one inbound event and all handlers it fans out to.
pub fn event(command: &str, source: Option<&str>) -> Span {
    match source {
        Some(source) => debug_span!("event", command = %command, source = %source),
        None => debug_span!("event", command = %command),
    }
}

/// Span for a single dispatcher handler run.
pub fn handler(name: &'static str) -> Span {
    debug_span!("handler", name = name)
}

/// Span for an administrative command execution.
pub fn command(name: &str, caller: &str, target: &str) -> Span {
    info_span!("command", name = %name, caller = %caller, target = %target)
}

/// Span for one domain check.
pub fn check(domain: &str, account: &str) -> Span {
    info_span!("check", domain = %domain, account = %account)
}
