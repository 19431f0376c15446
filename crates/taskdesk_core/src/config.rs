//! Application configuration resolved from the environment.
//!
//! # Responsibility
//! - Collect store path, logging and presentation settings in one place.
//! - Reject malformed values with a typed error instead of silently
//!   falling back.
//!
//! # Invariants
//! - Every setting has a default, so an empty environment is valid.
//! - Blank variables are treated as unset.

use crate::i18n::Language;
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "TASKDESK_DB_PATH";
pub const LOG_DIR_ENV: &str = "TASKDESK_LOG_DIR";
pub const LOG_LEVEL_ENV: &str = "TASKDESK_LOG_LEVEL";
pub const LANG_ENV: &str = "TASKDESK_LANG";
pub const NOTIFY_DAYS_ENV: &str = "TASKDESK_NOTIFY_DAYS";

/// Store file used when no path is configured.
pub const DEFAULT_DB_FILE_NAME: &str = "task_manager.db";

/// Configuration error for one environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLanguage(String),
    InvalidNotifyDays(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLanguage(value) => {
                write!(f, "{LANG_ENV} must be `ru` or `en`, got `{value}`")
            }
            Self::InvalidNotifyDays(value) => write!(
                f,
                "{NOTIFY_DAYS_ENV} must be a non-negative integer, got `{value}`"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Resolved application settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    /// Logging is disabled when `None`.
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    pub language: Language,
    /// Deadline notice window; `0` means due today only.
    pub notify_within_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_dir: None,
            log_level: default_log_level().to_string(),
            language: Language::default(),
            notify_within_days: 0,
        }
    }
}

impl AppConfig {
    /// Reads `TASKDESK_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through `lookup`, which maps a variable name to
    /// its raw value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(DB_PATH_ENV) {
            config.db_path = PathBuf::from(path);
        }
        config.log_dir = read(LOG_DIR_ENV).map(PathBuf::from);
        if let Some(level) = read(LOG_LEVEL_ENV) {
            config.log_level = level;
        }
        if let Some(value) = read(LANG_ENV) {
            config.language =
                Language::parse(&value).ok_or(ConfigError::InvalidLanguage(value))?;
        }
        if let Some(value) = read(NOTIFY_DAYS_ENV) {
            config.notify_within_days = value
                .parse()
                .map_err(|_| ConfigError::InvalidNotifyDays(value))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, DEFAULT_DB_FILE_NAME};
    use crate::i18n::Language;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_FILE_NAME));
        assert_eq!(config.log_dir, None);
        assert_eq!(config.language, Language::Russian);
        assert_eq!(config.notify_within_days, 0);
    }

    #[test]
    fn values_are_trimmed_and_blank_means_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("TASKDESK_DB_PATH", " /tmp/tasks.db "),
            ("TASKDESK_LOG_DIR", "   "),
            ("TASKDESK_LANG", "en"),
            ("TASKDESK_NOTIFY_DAYS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/tasks.db"));
        assert_eq!(config.log_dir, None);
        assert_eq!(config.language, Language::English);
        assert_eq!(config.notify_within_days, 3);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("TASKDESK_LANG", "klingon")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidLanguage("klingon".to_string()));

        let err = AppConfig::from_lookup(lookup_from(&[("TASKDESK_NOTIFY_DAYS", "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNotifyDays(_)));
    }
}
