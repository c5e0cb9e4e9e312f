//! Blocklist entry model and its operator-facing rendering.

use chrono::{DateTime, Utc};
use std::fmt;

/// One row of the MX blocklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxblEntry {
    /// Stable id assigned by the database.
    pub id: i64,
    /// Literal domain/address, or a glob.
    pub pattern: String,
    /// Free-text reason given by the operator.
    pub reason: String,
    /// Whether the entry is eligible to match.
    pub active: bool,
    /// Unix timestamp of creation.
    pub added: i64,
    /// Privilege identity of the operator who added it.
    pub added_by: String,
    /// Number of registrations this entry has caught.
    pub hits: i64,
    /// Unix timestamp of the latest hit.
    pub last_hit: Option<i64>,
}

/// Row layout shared by every SELECT in the repository.
pub(super) type MxblRow = (i64, String, String, bool, i64, String, i64, Option<i64>);

impl From<MxblRow> for MxblEntry {
    fn from(
        (id, pattern, reason, active, added, added_by, hits, last_hit): MxblRow,
    ) -> Self {
        Self {
            id,
            pattern,
            reason,
            active,
            added,
            added_by,
            hits,
            last_hit,
        }
    }
}

impl MxblEntry {
    /// Reason string attached to every directive caused by this entry.
    pub fn full_reason(&self) -> String {
        format!("mxbl #{} - {}", self.id, self.reason)
    }

    /// Render the entry as seen at `now`.
    pub fn render(&self, now: DateTime<Utc>) -> String {
        let now = now.timestamp();
        let last_hit = match self.last_hit {
            Some(ts) => pretty_delta(now - ts),
            None => "never".to_string(),
        };
        let state = if self.active { "ENABLED" } else { "DISABLED" };
        format!(
            "#{}: {} added {} by {} with {} hits (last hit: {}) [{}]",
            self.id,
            self.pattern,
            pretty_delta(now - self.added),
            self.added_by,
            self.hits,
            last_hit,
            state
        )
    }
}

impl fmt::Display for MxblEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(Utc::now()))
    }
}

/// Format elapsed seconds with the two largest non-zero units.
///
/// Clock skew can make `secs` negative; that renders as `0s ago`.
pub fn pretty_delta(secs: i64) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const WEEK: i64 = 7 * DAY;

    let secs = secs.max(0);
    let (weeks, rem) = (secs / WEEK, secs % WEEK);
    let (days, rem) = (rem / DAY, rem % DAY);
    let (hours, rem) = (rem / HOUR, rem % HOUR);
    let (minutes, seconds) = (rem / MINUTE, rem % MINUTE);

    if weeks > 0 {
        format!("{weeks}w{days}d ago")
    } else if days > 0 {
        format!("{days}d{hours}h ago")
    } else if hours > 0 {
        format!("{hours}h{minutes}m ago")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s ago")
    } else {
        format!("{seconds}s ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry() -> MxblEntry {
        MxblEntry {
            id: 7,
            pattern: "evil.com".into(),
            reason: "spam source".into(),
            active: true,
            added: 1_700_000_000,
            added_by: "root".into(),
            hits: 0,
            last_hit: None,
        }
    }

    #[test]
    fn pretty_delta_picks_two_largest_units() {
        assert_eq!(pretty_delta(0), "0s ago");
        assert_eq!(pretty_delta(59), "59s ago");
        assert_eq!(pretty_delta(61), "1m1s ago");
        assert_eq!(pretty_delta(3600 + 120 + 5), "1h2m ago");
        assert_eq!(pretty_delta(2 * 86400 + 3 * 3600 + 7), "2d3h ago");
        assert_eq!(pretty_delta(15 * 86400 + 3600), "2w1d ago");
        assert_eq!(pretty_delta(7 * 86400), "1w0d ago");
        assert_eq!(pretty_delta(-30), "0s ago");
    }

    #[test]
    fn render_fresh_entry() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(
            entry().render(now),
            "#7: evil.com added 0s ago by root with 0 hits (last hit: never) [ENABLED]"
        );
    }

    #[test]
    fn render_hit_and_disabled_entry() {
        let mut e = entry();
        e.active = false;
        e.hits = 3;
        e.last_hit = Some(1_700_000_000 + 3600);
        let now = Utc.timestamp_opt(1_700_000_000 + 2 * 3600 + 60, 0).unwrap();
        assert_eq!(
            e.render(now),
            "#7: evil.com added 2h1m ago by root with 3 hits (last hit: 1h1m ago) [DISABLED]"
        );
    }

    #[test]
    fn full_reason_format() {
        assert_eq!(entry().full_reason(), "mxbl #7 - spam source");
    }
}
