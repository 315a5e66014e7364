//! Configuration management for the filesystem facade.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables, a JSON document, or defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use super::error::ConfigError;
use super::security::{GuardOptions, WorkingDirectory};

/// Default stat-polling interval for `watch_file`, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5007;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root limit and working directory.
    pub guard: GuardConfig,

    /// Watcher defaults.
    pub watch: WatchConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Containment settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Base directory for relative paths.
    /// If None, the process current directory is tracked.
    pub working_directory: Option<String>,

    /// Directory boundary.
    /// If None, the working directory at construction time is used.
    pub root_limit: Option<String>,
}

/// Watcher defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Interval between `metadata` polls for `watch_file`.
    pub poll_interval_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Read `SAFE_FS_LOG_LEVEL` on its own, so a subscriber can be installed
    /// before the rest of the configuration is loaded and logged.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        match std::env::var("SAFE_FS_LOG_LEVEL") {
            Ok(level) => Self { level },
            Err(_) => Self::default(),
        }
    }
}

impl GuardConfig {
    /// Build guard options from this configuration.
    pub fn to_options(&self) -> GuardOptions {
        let working_directory = match &self.working_directory {
            Some(dir) => WorkingDirectory::fixed(dir.clone()),
            None => WorkingDirectory::current(),
        };

        GuardOptions {
            working_directory,
            root_limit: self.root_limit.clone(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON configuration document. Missing fields take defaults.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(document)?;
        if config.watch.poll_interval_ms == 0 {
            return Err(ConfigError::invalid_value("watch.poll_interval_ms", "0"));
        }
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `SAFE_FS_`:
    /// `SAFE_FS_PWD`, `SAFE_FS_ROOT`, `SAFE_FS_POLL_INTERVAL_MS`,
    /// `SAFE_FS_LOG_LEVEL`. A `.env` file is honored if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        config.logging = LoggingConfig::from_env();

        if let Ok(pwd) = std::env::var("SAFE_FS_PWD") {
            config.guard.working_directory = Some(pwd);
        }

        if let Some(root) = std::env::var("SAFE_FS_ROOT").ok().filter(|r| !r.is_empty()) {
            info!("Root limit set to {}", root);
            config.guard.root_limit = Some(root);
        } else {
            warn!(
                "SAFE_FS_ROOT not set - the working directory will be used as the root limit"
            );
        }

        if let Ok(interval) = std::env::var("SAFE_FS_POLL_INTERVAL_MS") {
            match parse_poll_interval(&interval) {
                Ok(ms) => config.watch.poll_interval_ms = ms,
                Err(e) => warn!("{}; keeping {}ms", e, config.watch.poll_interval_ms),
            }
        }

        config
    }
}

fn parse_poll_interval(value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .ok_or_else(|| ConfigError::invalid_value("SAFE_FS_POLL_INTERVAL_MS", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests run serially
    static ENV_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        unsafe {
            std::env::remove_var("SAFE_FS_PWD");
            std::env::remove_var("SAFE_FS_ROOT");
            std::env::remove_var("SAFE_FS_POLL_INTERVAL_MS");
            std::env::remove_var("SAFE_FS_LOG_LEVEL");
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.guard.working_directory.is_none());
        assert!(config.guard.root_limit.is_none());
        assert_eq!(config.watch.poll_interval_ms, 5007);
        assert_eq!(config.watch.poll_interval(), Duration::from_millis(5007));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("SAFE_FS_PWD", "/srv/app");
            std::env::set_var("SAFE_FS_ROOT", "/srv");
            std::env::set_var("SAFE_FS_POLL_INTERVAL_MS", "250");
            std::env::set_var("SAFE_FS_LOG_LEVEL", "debug");
        }

        let config = Config::from_env();
        assert_eq!(config.guard.working_directory.as_deref(), Some("/srv/app"));
        assert_eq!(config.guard.root_limit.as_deref(), Some("/srv"));
        assert_eq!(config.watch.poll_interval_ms, 250);
        assert_eq!(config.logging.level, "debug");

        clear_env();
    }

    #[test]
    fn test_invalid_poll_interval_keeps_default() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("SAFE_FS_POLL_INTERVAL_MS", "soon");
        }

        let config = Config::from_env();
        assert_eq!(config.watch.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);

        clear_env();
    }

    #[test]
    fn test_parse_poll_interval_rejects_zero() {
        assert!(parse_poll_interval("0").is_err());
        assert_eq!(parse_poll_interval(" 100 ").unwrap(), 100);
    }

    #[test]
    fn test_from_json_partial_document() {
        let config =
            Config::from_json(r#"{ "guard": { "root_limit": "/data" }, "watch": {} }"#).unwrap();
        assert_eq!(config.guard.root_limit.as_deref(), Some("/data"));
        assert!(config.guard.working_directory.is_none());
        assert_eq!(config.watch.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_logging_config_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_env();
        assert_eq!(LoggingConfig::from_env().level, "info");

        unsafe {
            std::env::set_var("SAFE_FS_LOG_LEVEL", "trace");
        }
        assert_eq!(LoggingConfig::from_env().level, "trace");
        assert_eq!(Config::from_env().logging.level, "trace");

        clear_env();
    }

    #[test]
    fn test_from_json_rejects_zero_poll_interval() {
        let err = Config::from_json(r#"{ "watch": { "poll_interval_ms": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(err.to_string(), "Invalid value '0' for watch.poll_interval_ms");
    }

    #[test]
    fn test_empty_root_env_is_unset() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("SAFE_FS_PWD", "/sandbox");
            std::env::set_var("SAFE_FS_ROOT", "");
        }

        let config = Config::from_env();
        assert!(config.guard.root_limit.is_none());
        let guard = crate::core::PathGuard::new(config.guard.to_options());
        assert!(!guard.is_allowed("/etc/passwd"));

        clear_env();
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            Config::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_guard_options_from_config() {
        let guard = GuardConfig {
            working_directory: Some("/srv/app".to_string()),
            root_limit: Some("/srv".to_string()),
        };
        let options = guard.to_options();
        assert_eq!(options.working_directory.get(), "/srv/app");
        assert_eq!(options.root_limit.as_deref(), Some("/srv"));

        let options = GuardConfig::default().to_options();
        assert!(matches!(options.working_directory, WorkingDirectory::Dynamic(_)));
        assert!(options.root_limit.is_none());
    }
}
