//! Process configuration.
//!
//! # Responsibility
//! - Name every environment variable the application reads.
//! - Resolve store, logging and insight settings with defaults.
//!
//! # Invariants
//! - Blank environment values are treated as unset.
//! - Resolution never touches the filesystem or the network.

use crate::insight::InsightSettings;
use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Environment variable names.
pub mod env_vars {
    pub const STORAGE_DIR: &str = "STOCKNOTE_STORAGE_DIR";
    pub const LOG_LEVEL: &str = "STOCKNOTE_LOG_LEVEL";
    /// Absolute directory for rolling log files. File logging is off when unset.
    pub const LOG_DIR: &str = "STOCKNOTE_LOG_DIR";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const LLM_BASE_URL: &str = "STOCKNOTE_LLM_BASE_URL";
    pub const LLM_MODEL: &str = "STOCKNOTE_LLM_MODEL";
    /// Set to "true" or "1" to ignore the API key and analyze offline.
    pub const OFFLINE: &str = "STOCKNOTE_OFFLINE";
}

/// Default values.
pub mod defaults {
    pub const STORAGE_DIR: &str = "./data/knowledge_base";
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLogLevel { var: &'static str, message: String },
    InvalidBoolean { var: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel { var, message } => write!(f, "{var}: {message}"),
            Self::InvalidBoolean { var, value } => {
                write!(f, "{var}: expected true|false|1|0|yes|no|on|off, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Store location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub storage_directory: PathBuf,
}

impl StoreConfig {
    pub fn new(storage_directory: impl Into<PathBuf>) -> Self {
        Self {
            storage_directory: storage_directory.into(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(defaults::STORAGE_DIR)
    }
}

/// Fully resolved application settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub log_level: &'static str,
    pub log_dir: Option<String>,
    /// `None` when unset, blank, or overridden by offline mode.
    pub api_key: Option<String>,
    pub insight: InsightSettings,
}

impl AppConfig {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, which returns the raw value of an
    /// environment variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let store = read(env_vars::STORAGE_DIR)
            .map(StoreConfig::new)
            .unwrap_or_default();

        let log_level = match read(env_vars::LOG_LEVEL) {
            Some(level) => normalize_level(&level).map_err(|err| ConfigError::InvalidLogLevel {
                var: env_vars::LOG_LEVEL,
                message: err.to_string(),
            })?,
            None => default_log_level(),
        };

        let offline = match read(env_vars::OFFLINE) {
            Some(value) => parse_bool(env_vars::OFFLINE, &value)?,
            None => false,
        };

        let mut insight = InsightSettings::default();
        if let Some(base_url) = read(env_vars::LLM_BASE_URL) {
            insight.base_url = base_url;
        }
        if let Some(model) = read(env_vars::LLM_MODEL) {
            insight.model = model;
        }

        Ok(Self {
            store,
            log_level,
            log_dir: read(env_vars::LOG_DIR),
            api_key: read(env_vars::OPENAI_API_KEY).filter(|_| !offline),
            insight,
        })
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBoolean {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.store, StoreConfig::default());
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.log_dir, None);
        assert_eq!(config.api_key, None);
        assert_eq!(config.insight, InsightSettings::default());
    }

    #[test]
    fn reads_overrides_and_ignores_blank_values() {
        let config = config_from(&[
            (env_vars::STORAGE_DIR, "/tmp/kb"),
            (env_vars::LOG_LEVEL, " WARNING "),
            (env_vars::OPENAI_API_KEY, "   "),
            (env_vars::LLM_MODEL, "gpt-4o-mini"),
        ])
        .unwrap();
        assert_eq!(config.store.storage_directory, PathBuf::from("/tmp/kb"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.api_key, None);
        assert_eq!(config.insight.model, "gpt-4o-mini");
    }

    #[test]
    fn offline_flag_drops_api_key() {
        let config = config_from(&[
            (env_vars::OPENAI_API_KEY, "sk-test"),
            (env_vars::OFFLINE, "yes"),
        ])
        .unwrap();
        assert_eq!(config.api_key, None);

        let config = config_from(&[
            (env_vars::OPENAI_API_KEY, "sk-test"),
            (env_vars::OFFLINE, "0"),
        ])
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn rejects_invalid_values() {
        let err = config_from(&[(env_vars::LOG_LEVEL, "loud")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel { .. }));

        let err = config_from(&[(env_vars::OFFLINE, "maybe")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidBoolean {
                var: env_vars::OFFLINE,
                value: "maybe".to_string()
            }
        );
    }
}
