//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Network connection and identity.
    pub irc: IrcConfig,
    /// Optional SASL PLAIN credentials.
    pub sasl: Option<SaslConfig>,
    /// Optional operator credentials.
    pub oper: Option<OperConfig>,
    /// Blocklist storage.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Behavioral knobs.
    #[serde(default)]
    pub settings: SettingsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Channels to join after registration: configured channels plus the
    /// audit log channel.
    pub fn autojoin(&self) -> Vec<String> {
        let mut channels = self.irc.channels.clone();
        if let Some(log) = &self.irc.log
            && !channels.iter().any(|c| mxbl_proto::irc_eq(c, log))
        {
            channels.push(log.clone());
        }
        channels
    }
}

/// Network connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    /// Server hostname.
    pub server: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connect with TLS.
    #[serde(default = "default_true")]
    pub tls: bool,
    /// Nickname to register with.
    pub nickname: String,
    /// Username (ident); defaults to the nickname.
    pub username: Option<String>,
    /// Realname (GECOS); defaults to the nickname.
    pub realname: Option<String>,
    /// Server password (PASS).
    #[serde(rename = "pass")]
    pub password: Option<String>,
    /// Channels to join.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Audit log channel.
    pub log: Option<String>,
}

impl IrcConfig {
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.nickname)
    }

    pub fn realname(&self) -> &str {
        self.realname.as_deref().unwrap_or(&self.nickname)
    }
}

/// SASL PLAIN credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct SaslConfig {
    pub user: String,
    #[serde(rename = "pass")]
    pub password: String,
}

/// Operator credentials, sent with OPER after welcome.
#[derive(Debug, Clone, Deserialize)]
pub struct OperConfig {
    pub user: String,
    #[serde(rename = "pass")]
    pub password: String,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file (`:memory:` for a throwaway database).
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// How callers without a privilege tag are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallerPolicyConfig {
    /// Commands from untagged callers are dropped.
    #[default]
    Ignore,
    /// Untagged callers act as `settings.fallback_identity`.
    Fallback,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Behavioral settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsConfig {
    /// DNS and WHOIS timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    /// Maximum DNS queries spent on a single domain check.
    #[serde(default = "default_max_lookups")]
    pub max_lookups: usize,
    /// Nick of the account-services bot.
    #[serde(default = "default_services")]
    pub services: String,
    /// Seconds to wait before reconnecting.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: u64,
    /// Treatment of commands without a privilege tag.
    #[serde(default)]
    pub untagged_callers: CallerPolicyConfig,
    /// Identity used by the `fallback` caller policy.
    #[serde(default = "default_fallback_identity")]
    pub fallback_identity: String,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

impl SettingsConfig {
    /// `timeout` as a [`Duration`]; non-finite or negative values clamp to zero.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout).unwrap_or(Duration::ZERO)
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_lookups: default_max_lookups(),
            services: default_services(),
            reconnect_delay: default_reconnect_delay(),
            untagged_callers: CallerPolicyConfig::default(),
            fallback_identity: default_fallback_identity(),
            log_format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [irc]
        server = "irc.example.net"
        nickname = "mxbl"
    "#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.irc.port, 6697);
        assert!(config.irc.tls);
        assert_eq!(config.irc.username(), "mxbl");
        assert_eq!(config.database.path, "mxbld.db");
        assert_eq!(config.settings.services, "NickServ");
        assert_eq!(config.settings.max_lookups, 128);
        assert_eq!(config.settings.untagged_callers, CallerPolicyConfig::Ignore);
        assert_eq!(config.settings.timeout(), Duration::from_secs(5));
        assert!(config.sasl.is_none());
    }

    #[test]
    fn load_full_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r##"
            [irc]
            server = "irc.example.net"
            port = 6667
            tls = false
            nickname = "mxbl"
            realname = "mx blocklist"
            channels = ["#ops"]
            log = "#mxbl-log"

            [sasl]
            user = "mxbl"
            pass = "hunter2"

            [database]
            path = ":memory:"

            [settings]
            timeout = 2.5
            untagged_callers = "fallback"
            fallback_identity = "yeah"
            log_format = "json"
            "##
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.irc.port, 6667);
        assert!(!config.irc.tls);
        assert_eq!(config.irc.realname(), "mx blocklist");
        assert_eq!(config.sasl.as_ref().unwrap().password, "hunter2");
        assert_eq!(config.settings.timeout(), Duration::from_millis(2500));
        assert_eq!(config.settings.untagged_callers, CallerPolicyConfig::Fallback);
        assert_eq!(config.settings.log_format, LogFormat::Json);
        assert_eq!(config.autojoin(), vec!["#ops", "#mxbl-log"]);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load("/nonexistent/mxbld.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
