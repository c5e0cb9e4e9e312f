//! WHOIS request/response correlation.
//!
//! Replies are keyed by the case-folded nickname. A request opens a pending
//! slot; `311` fills it, `318` or `401` closes it and wakes every waiter.
//! Concurrent lookups of the same nick share one WHOIS on the wire.

use dashmap::DashMap;
use mxbl_proto::{Message, irc_to_lower, response};
use tokio::sync::oneshot;

use super::WhoisInfo;

#[derive(Default)]
struct Pending {
    info: Option<WhoisInfo>,
    waiters: Vec<oneshot::Sender<Option<WhoisInfo>>>,
}

/// Outstanding WHOIS lookups.
#[derive(Default)]
pub struct WhoisTracker {
    pending: DashMap<String, Pending>,
}

impl WhoisTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in `nick`.
    ///
    /// Returns the receiver for the eventual reply and whether this caller
    /// opened the slot (and so must send the WHOIS itself).
    pub fn register(&self, nick: &str) -> (oneshot::Receiver<Option<WhoisInfo>>, bool) {
        let (tx, rx) = oneshot::channel();
        let mut slot = self.pending.entry(irc_to_lower(nick)).or_default();
        let first = slot.waiters.is_empty();
        slot.waiters.push(tx);
        (rx, first)
    }

    /// Prune waiters that gave up on `nick`.
    ///
    /// The slot itself is removed only once nobody is waiting on it; later
    /// joiners keep waiting for the reply already on its way.
    pub fn abandon(&self, nick: &str) {
        let key = irc_to_lower(nick);
        if let Some(mut slot) = self.pending.get_mut(&key) {
            slot.waiters.retain(|waiter| !waiter.is_closed());
        }
        self.pending.remove_if(&key, |_, slot| slot.waiters.is_empty());
    }

    /// Feed an inbound message. Non-WHOIS traffic is ignored.
    pub fn observe(&self, msg: &Message) {
        let Some(nick) = msg.param(1) else {
            return;
        };
        let key = irc_to_lower(nick);

        match msg.command.as_str() {
            response::RPL_WHOISUSER => {
                if let Some(mut slot) = self.pending.get_mut(&key)
                    && let (Some(user), Some(host)) = (msg.param(2), msg.param(3))
                {
                    slot.info = Some(WhoisInfo {
                        nick: nick.to_owned(),
                        user: user.to_owned(),
                        host: host.to_owned(),
                    });
                }
            }
            response::RPL_ENDOFWHOIS | response::ERR_NOSUCHNICK => {
                if let Some((_, slot)) = self.pending.remove(&key) {
                    for waiter in slot.waiters {
                        let _ = waiter.send(slot.info.clone());
                    }
                }
            }
            _ => {}
        }
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
