//! Configuration for the settings manager

use crate::codec::ArrayFormat;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Source of environment variables (injectable for tests)
pub trait EnvSource: Send + Sync {
    /// Look up one variable
    fn var(&self, key: &str) -> std::result::Result<String, std::env::VarError>;
}

/// Reads the real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEnvSource;

impl EnvSource for DefaultEnvSource {
    fn var(&self, key: &str) -> std::result::Result<String, std::env::VarError> {
        std::env::var(key)
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> std::result::Result<String, std::env::VarError> {
        self.get(key).cloned().ok_or(std::env::VarError::NotPresent)
    }
}

/// Which storage backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// Single JSON document on disk (default)
    #[default]
    File,
    /// SQLite table, one row per setting
    Database,
}

impl FromStr for Driver {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Driver::File),
            "database" => Ok(Driver::Database),
            other => Err(Error::Config(format!(
                "Unknown driver '{other}': expected file or database"
            ))),
        }
    }
}

/// File backend options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Path of the JSON settings document
    pub path: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("storage/app/settings.json"),
        }
    }
}

/// Table backend options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file
    pub path: PathBuf,
    /// Name of the settings table
    pub table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("storage/app/settings.sqlite"),
            table: "settings".into(),
        }
    }
}

/// Snapshot cache options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache the settings snapshot
    pub enabled: bool,
    /// Cache key the snapshot is stored under
    pub key: String,
    /// Time to live in seconds
    pub ttl: u64,
}

impl CacheConfig {
    /// TTL as a [`Duration`]
    pub fn ttl_duration(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            key: "app-settings".into(),
            ttl: 3600,
        }
    }
}

/// Configuration for building a [`SettingsManager`](crate::SettingsManager)
///
/// Every field has a default, so a config file only needs the keys it changes:
///
/// ```rust
/// use settings_store::{Driver, SettingsConfig};
///
/// let config: SettingsConfig = serde_json::from_str(r#"{
///     "driver": "database",
///     "cache": { "enabled": true }
/// }"#).unwrap();
///
/// assert_eq!(config.driver, Driver::Database);
/// assert_eq!(config.cache.ttl, 3600);
/// ```
#[derive(Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Storage backend to open
    pub driver: Driver,
    /// Encrypt values before they reach the backend
    pub encrypt: bool,
    /// Application secret used for encryption (`base64:<key>` or any passphrase)
    pub app_key: Option<String>,
    /// Rendering of arrays/objects on single-key reads
    pub array_format: ArrayFormat,
    /// File backend options
    pub file: FileConfig,
    /// Table backend options
    pub database: DatabaseConfig,
    /// Snapshot cache options
    pub cache: CacheConfig,
}

impl fmt::Debug for SettingsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsConfig")
            .field("driver", &self.driver)
            .field("encrypt", &self.encrypt)
            .field("app_key", &self.app_key.as_ref().map(|_| "<redacted>"))
            .field("array_format", &self.array_format)
            .field("file", &self.file)
            .field("database", &self.database)
            .field("cache", &self.cache)
            .finish()
    }
}

impl SettingsConfig {
    /// Create a new builder for `SettingsConfig`
    ///
    /// # Example
    /// ```rust
    /// use settings_store::{ArrayFormat, SettingsConfig};
    ///
    /// let config = SettingsConfig::builder()
    ///     .file_path("/tmp/my-app/settings.json")
    ///     .array_format(ArrayFormat::Csv)
    ///     .cache("my-app-settings", 600)
    ///     .build();
    ///
    /// assert!(config.cache.enabled);
    /// ```
    pub fn builder() -> SettingsConfigBuilder {
        SettingsConfigBuilder::default()
    }

    /// Load a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = crate::error::read_file(path)?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("Invalid config file '{}': {e}", path.display()))
        })
    }

    /// Check that the configuration can build a manager
    pub fn validate(&self) -> Result<()> {
        if self.encrypt && self.app_key.as_deref().is_none_or(str::is_empty) {
            return Err(Error::Config(
                "Encryption is enabled but no application key is configured".into(),
            ));
        }
        if self.cache.enabled && self.cache.key.is_empty() {
            return Err(Error::Config("Cache is enabled but the cache key is empty".into()));
        }
        Ok(())
    }

    /// Override fields from the process environment
    ///
    /// See [`apply_env`](Self::apply_env) for the variable names.
    pub fn with_env_overrides(mut self, prefix: &str) -> Result<Self> {
        self.apply_env(prefix, &DefaultEnvSource)?;
        Ok(self)
    }

    /// Override fields from environment variables
    ///
    /// Variables are `{PREFIX}_{NAME}` (prefix uppercased): `DRIVER`, `ENCRYPT`,
    /// `APP_KEY`, `ARRAY_FORMAT`, `FILE_PATH`, `DATABASE_PATH`,
    /// `DATABASE_TABLE`, `CACHE_ENABLED`, `CACHE_KEY`, `CACHE_TTL`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable holds an unparsable value.
    pub fn apply_env(&mut self, prefix: &str, source: &dyn EnvSource) -> Result<()> {
        let prefix = prefix.to_uppercase();
        let var = |name: &str| source.var(&format!("{prefix}_{name}")).ok();

        if let Some(v) = var("DRIVER") {
            self.driver = v.parse()?;
        }
        if let Some(v) = var("ENCRYPT") {
            self.encrypt = parse_bool("ENCRYPT", &v)?;
        }
        if let Some(v) = var("APP_KEY") {
            self.app_key = Some(v);
        }
        if let Some(v) = var("ARRAY_FORMAT") {
            self.array_format = v.parse()?;
        }
        if let Some(v) = var("FILE_PATH") {
            self.file.path = PathBuf::from(v);
        }
        if let Some(v) = var("DATABASE_PATH") {
            self.database.path = PathBuf::from(v);
        }
        if let Some(v) = var("DATABASE_TABLE") {
            self.database.table = v;
        }
        if let Some(v) = var("CACHE_ENABLED") {
            self.cache.enabled = parse_bool("CACHE_ENABLED", &v)?;
        }
        if let Some(v) = var("CACHE_KEY") {
            self.cache.key = v;
        }
        if let Some(v) = var("CACHE_TTL") {
            self.cache.ttl = v.trim().parse().map_err(|_| {
                Error::Config(format!("{prefix}_CACHE_TTL must be a number of seconds, got '{v}'"))
            })?;
        }
        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Config(format!("{name} must be a boolean, got '{other}'"))),
    }
}

/// Builder for creating `SettingsConfig` with a fluent API
#[derive(Clone, Default)]
pub struct SettingsConfigBuilder {
    config: SettingsConfig,
}

impl fmt::Debug for SettingsConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl SettingsConfigBuilder {
    /// Store settings in a JSON document at `path`
    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.driver = Driver::File;
        self.config.file.path = path.into();
        self
    }

    /// Store settings in table `table` of the SQLite database at `path`
    pub fn database(mut self, path: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        self.config.driver = Driver::Database;
        self.config.database.path = path.into();
        self.config.database.table = table.into();
        self
    }

    /// Encrypt values with the given application secret
    pub fn encrypt_with(mut self, app_key: impl Into<String>) -> Self {
        self.config.encrypt = true;
        self.config.app_key = Some(app_key.into());
        self
    }

    /// Rendering of arrays/objects on single-key reads (default: json)
    pub fn array_format(mut self, format: ArrayFormat) -> Self {
        self.config.array_format = format;
        self
    }

    /// Enable snapshot caching under `key` for `ttl_secs` seconds
    pub fn cache(mut self, key: impl Into<String>, ttl_secs: u64) -> Self {
        self.config.cache = CacheConfig {
            enabled: true,
            key: key.into(),
            ttl: ttl_secs,
        };
        self
    }

    /// Build the `SettingsConfig`
    pub fn build(self) -> SettingsConfig {
        self.config
    }
}
