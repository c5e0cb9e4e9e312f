//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions and file loading
//! - [`defaults`]: serde default value functions
//! - [`validation`]: startup validation of a loaded config

mod defaults;
mod types;
mod validation;

pub use types::{
    CallerPolicyConfig, Config, ConfigError, DatabaseConfig, IrcConfig, LogFormat, OperConfig,
    SaslConfig, SettingsConfig,
};
pub use validation::{ValidationError, validate};
