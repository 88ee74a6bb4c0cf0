//! # Configuration
//!
//! Runtime settings for the database layer and the checkout engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KASSA_DATABASE_PATH=/var/lib/kassa/kassa.db                        │
//! │     KASSA_COMMIT_TIMEOUT_MS=5000                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     path given explicitly, or $KASSA_CONFIG                            │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     ./kassa.db, 5 connections, 5s busy timeout, 10s commit timeout     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # kassa.toml
//! [database]
//! path = "/var/lib/kassa/kassa.db"
//! max_connections = 8
//! busy_timeout_ms = 5000
//!
//! [checkout]
//! commit_timeout_ms = 10000
//!
//! [logging]
//! filter = "info,kassa=debug,sqlx=warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::pool::DbConfig;

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "KASSA_CONFIG";

/// Default tracing filter for binaries.
pub const DEFAULT_LOG_FILTER: &str = "info,kassa=debug,sqlx=warn";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite database file. Created on first start.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Pool size. Each concurrent checkout holds one connection.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a statement waits for another writer's lock.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./kassa.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

// =============================================================================
// Checkout Settings
// =============================================================================

/// `[checkout]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSettings {
    /// Upper bound on the whole checkout transaction, lock waits included.
    ///
    /// When it elapses the transaction is rolled back and the caller gets
    /// a retryable error.
    #[serde(default = "default_commit_timeout_ms")]
    pub commit_timeout_ms: u64,
}

fn default_commit_timeout_ms() -> u64 {
    10_000
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            commit_timeout_ms: default_commit_timeout_ms(),
        }
    }
}

impl CheckoutSettings {
    pub fn with_commit_timeout(timeout: Duration) -> Self {
        CheckoutSettings {
            commit_timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }
}

// =============================================================================
// Logging Settings
// =============================================================================

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive. `RUST_LOG` wins over it.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete Kassa configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KassaConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl KassaConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else `$KASSA_CONFIG`)
    /// 3. `KASSA_*` environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    /// Same as [`KassaConfig::load`] with an injectable variable lookup.
    pub fn load_with<F>(config_path: Option<PathBuf>, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(|| lookup(CONFIG_PATH_ENV).map(PathBuf::from)) {
            if path.exists() {
                info!(?path, "Loading config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(&lookup)?;
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.checkout.commit_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "checkout.commit_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        Ok(())
    }

    /// Applies `KASSA_*` overrides. Unparseable values are errors.
    fn apply_env_overrides<F>(&mut self, lookup: &F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("KASSA_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(value) = lookup("KASSA_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("KASSA_MAX_CONNECTIONS", &value)?;
        }

        if let Some(value) = lookup("KASSA_BUSY_TIMEOUT_MS") {
            self.database.busy_timeout_ms = parse_env("KASSA_BUSY_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = lookup("KASSA_COMMIT_TIMEOUT_MS") {
            self.checkout.commit_timeout_ms = parse_env("KASSA_COMMIT_TIMEOUT_MS", &value)?;
        }

        if let Some(filter) = lookup("KASSA_LOG") {
            self.logging.filter = filter;
        }

        Ok(())
    }

    /// Pool configuration for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    // try_init: a subscriber may already be installed (tests, embedding apps)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = KassaConfig::load_with(None, env(&[])).unwrap();
        assert_eq!(config.database.path, PathBuf::from("./kassa.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.checkout.commit_timeout(), Duration::from_secs(10));
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_toml_parsing() {
        let config: KassaConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/shop.db"
            busy_timeout_ms = 250

            [checkout]
            commit_timeout_ms = 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.database.busy_timeout_ms, 250);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.checkout.commit_timeout_ms, 1500);
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kassa.toml");
        std::fs::write(&path, "[database]\nmax_connections = 3\n").unwrap();

        let config = KassaConfig::load_with(
            Some(path),
            env(&[("KASSA_MAX_CONNECTIONS", "12"), ("KASSA_LOG", "warn")]),
        )
        .unwrap();

        assert_eq!(config.database.max_connections, 12);
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn test_config_path_from_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kassa.toml");
        std::fs::write(&path, "[checkout]\ncommit_timeout_ms = 42\n").unwrap();

        let config =
            KassaConfig::load_with(None, env(&[(CONFIG_PATH_ENV, path.to_str().unwrap())]))
                .unwrap();

        assert_eq!(config.checkout.commit_timeout_ms, 42);
    }

    #[test]
    fn test_invalid_values() {
        let err = KassaConfig::load_with(None, env(&[("KASSA_BUSY_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = KassaConfig::load_with(None, env(&[("KASSA_COMMIT_TIMEOUT_MS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_db_config() {
        let mut config = KassaConfig::default();
        config.database.busy_timeout_ms = 750;

        let db_config = config.db_config();
        assert_eq!(db_config.busy_timeout, Duration::from_millis(750));
        assert_eq!(db_config.max_connections, 5);
    }
}
