//! Actions taken against an account whose email domain is blocklisted.

use tracing::{debug, info, warn};

use super::engine::Match;
use crate::irc::OutboundError;
use crate::state::Agent;

/// Identity used in the audit line when WHOIS finds nobody.
pub const UNKNOWN_USER: &str = "<Unknown user>";

/// Notice sent to a dropped account.
pub const DROP_NOTICE: &str = "Your account has been dropped, please register it again with a valid email address (no disposable/temporary email)";

/// Which steps of an enforcement went through.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Enforcement {
    /// Hit counter bumped.
    pub hit: bool,
    /// `BADMAIL ADD` sent.
    pub badmail: bool,
    /// `FDROP` or `FREEZE` sent.
    pub account_action: bool,
    /// Audit line delivered (trivially true without a log channel).
    pub audited: bool,
    /// Drop notice sent; always false for email changes.
    pub notified: bool,
}

/// Act on a match for `account`, registered (`drop`) or changed to an email
/// at `domain`.
///
/// Every step runs even if an earlier one failed; nothing is rolled back.
pub async fn enforce(
    agent: &Agent,
    found: &Match,
    domain: &str,
    account: &str,
    drop: bool,
) -> Enforcement {
    let mut outcome = Enforcement::default();
    let services = agent.services();
    let id = found.entry.id;

    match agent.db.mxbl().hit(id).await {
        Ok(Some(hits)) => {
            debug!(id, hits, "Recorded hit");
            outcome.hit = true;
        }
        Ok(None) => warn!(id, "Entry disappeared before its hit was recorded"),
        Err(e) => warn!(id, error = %e, "Failed to record hit"),
    }

    let badmail = format!("BADMAIL ADD *@{domain} {}", found.reason);
    outcome.badmail = step("badmail", agent.outbound.privmsg(services, &badmail).await);

    outcome.account_action = if drop {
        let fdrop = format!("FDROP {account}");
        step("fdrop", agent.outbound.privmsg(services, &fdrop).await)
    } else {
        let freeze = format!("FREEZE {account} ON changed email to {domain} ({})", found.reason);
        step("freeze", agent.outbound.privmsg(services, &freeze).await)
    };

    let hostmask = match agent.outbound.whois(account).await {
        Some(info) => info.hostmask(),
        None => UNKNOWN_USER.to_owned(),
    };
    let audit = format!("BAD: {hostmask} registered {account} with *@{domain} ({})", found.reason);
    info!(account = %account, domain = %domain, id, "{audit}");
    outcome.audited = step("audit", agent.log(&audit).await);

    if drop {
        outcome.notified = step("notice", agent.outbound.notice(account, DROP_NOTICE).await);
    }

    outcome
}

fn step(name: &'static str, result: Result<(), OutboundError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(step = name, error = %e, "Enforcement step failed");
            false
        }
    }
}
