//! Default value functions for configuration.

pub fn default_port() -> u16 {
    6697
}

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

pub fn default_database_path() -> String {
    "mxbld.db".to_string()
}

// =============================================================================
// Settings Defaults
// =============================================================================

pub fn default_timeout() -> f64 {
    5.0
}

pub fn default_max_lookups() -> usize {
    128
}

pub fn default_services() -> String {
    "NickServ".to_string()
}

pub fn default_reconnect_delay() -> u64 {
    10
}

pub fn default_fallback_identity() -> String {
    "unknown".to_string()
}
