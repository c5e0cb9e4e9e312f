//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("irc.server is required")]
    MissingServer,
    #[error("irc.nickname is required")]
    MissingNickname,
    #[error("irc.log must be a channel name, got '{0}'")]
    LogNotChannel(String),
    #[error("sasl.user must not be empty")]
    EmptySaslUser,
    #[error("database.path is required")]
    MissingDatabasePath,
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
    #[error("settings.timeout must be positive, got {0}")]
    InvalidTimeout(f64),
    #[error("settings.max_lookups must be at least 1")]
    ZeroMaxLookups,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.irc.server.trim().is_empty() {
        errors.push(ValidationError::MissingServer);
    }
    if config.irc.nickname.trim().is_empty() {
        errors.push(ValidationError::MissingNickname);
    }
    if let Some(log) = &config.irc.log
        && !mxbl_proto::is_channel_name(log)
    {
        errors.push(ValidationError::LogNotChannel(log.clone()));
    }
    if let Some(sasl) = &config.sasl
        && sasl.user.is_empty()
    {
        errors.push(ValidationError::EmptySaslUser);
    }

    let db_path = &config.database.path;
    if db_path.is_empty() {
        errors.push(ValidationError::MissingDatabasePath);
    } else if db_path != ":memory:"
        && let Some(parent) = Path::new(db_path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        errors.push(ValidationError::DatabasePathInvalid(db_path.clone()));
    }

    let timeout = config.settings.timeout;
    if !(timeout.is_finite() && timeout > 0.0) {
        errors.push(ValidationError::InvalidTimeout(timeout));
    }
    if config.settings.max_lookups == 0 {
        errors.push(ValidationError::ZeroMaxLookups);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
