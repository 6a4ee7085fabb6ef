//! Builder for SettingsManager
//!
//! This module contains [`SettingsManagerBuilder`] which provides a fluent API
//! for creating a [`SettingsManager`](super::SettingsManager).

use crate::cache::{CacheStore, SettingsCache};
use crate::codec::{ArrayFormat, ValueCodec};
use crate::config::SettingsConfig;
use crate::error::{Error, Result};
use crate::storage::StorageBackend;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use super::SettingsManager;

/// Builder for creating a [`SettingsManager`] with a fluent API.
///
/// # Example
///
/// ```rust,no_run
/// use settings_store::{SettingsManager, cache::MemoryCache, storage::FileBackend};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let shared = Arc::new(MemoryCache::new());
/// let manager = SettingsManager::builder(FileBackend::new("settings.json"))
///     .encryption_key("my-app-secret")
///     .cache("my-app-settings", Duration::from_secs(600))
///     .cache_store(shared)
///     .build()
///     .unwrap();
/// ```
pub struct SettingsManagerBuilder<S: StorageBackend> {
    backend: S,
    array_format: ArrayFormat,
    encryption_key: Option<String>,
    cache: Option<(String, Duration)>,
    cache_store: Option<Arc<dyn CacheStore>>,
}

impl<S: StorageBackend> SettingsManagerBuilder<S> {
    /// Create a new builder around a backend.
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            array_format: ArrayFormat::Json,
            encryption_key: None,
            cache: None,
            cache_store: None,
        }
    }

    /// Apply encryption, array format and cache options from a config.
    pub fn with_config(mut self, config: &SettingsConfig) -> Self {
        self.array_format = config.array_format;
        self.encryption_key = if config.encrypt {
            config.app_key.clone()
        } else {
            None
        };
        self.cache = config
            .cache
            .enabled
            .then(|| (config.cache.key.clone(), config.cache.ttl_duration()));
        self
    }

    /// Encrypt values with the application secret.
    ///
    /// `base64:<key>` secrets are used as the raw 32-byte key, anything else is
    /// hashed into one.
    pub fn encryption_key(mut self, secret: impl Into<String>) -> Self {
        self.encryption_key = Some(secret.into());
        self
    }

    /// Rendering of arrays/objects on single-key reads (default: json).
    pub fn array_format(mut self, format: ArrayFormat) -> Self {
        self.array_format = format;
        self
    }

    /// Cache the decrypted snapshot under `key` for `ttl`.
    pub fn cache(mut self, key: impl Into<String>, ttl: Duration) -> Self {
        self.cache = Some((key.into(), ttl));
        self
    }

    /// Keep cached snapshots in a shared store instead of a private one.
    ///
    /// Only takes effect when caching is enabled.
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Build the [`SettingsManager`].
    ///
    /// # Errors
    ///
    /// Returns an error if the encryption key is invalid, encryption was
    /// requested without the `encryption` feature, or the cache key is empty.
    pub fn build(self) -> Result<SettingsManager<S>> {
        let codec = build_codec(self.array_format, self.encryption_key.as_deref())?;

        let cache = match self.cache {
            Some((key, _)) if key.is_empty() => {
                return Err(Error::Config("Cache key must not be empty".into()));
            }
            Some((key, ttl)) => {
                if ttl.is_zero() {
                    warn!("Cache '{key}' has a zero TTL, snapshots will never be cached");
                }
                Some(match self.cache_store {
                    Some(store) => SettingsCache::with_store(store, key, ttl),
                    None => SettingsCache::new(key, ttl),
                })
            }
            None => None,
        };

        info!(
            "Initialized SettingsManager ({} backend, encryption {}, array format {}, cache {})",
            self.backend.backend_name(),
            if codec.is_encrypting() { "on" } else { "off" },
            codec.array_format(),
            cache.as_ref().map_or("off", |c| c.key()),
        );

        Ok(SettingsManager {
            backend: self.backend,
            codec,
            cache,
        })
    }
}

#[cfg(feature = "encryption")]
fn build_codec(format: ArrayFormat, secret: Option<&str>) -> Result<ValueCodec> {
    let codec = ValueCodec::new(format);
    Ok(match secret {
        Some(secret) => codec.with_encrypter(crate::codec::Encrypter::from_secret(secret)?),
        None => codec,
    })
}

#[cfg(not(feature = "encryption"))]
fn build_codec(format: ArrayFormat, secret: Option<&str>) -> Result<ValueCodec> {
    if secret.is_some() {
        return Err(Error::Config(
            "Encryption requires the `encryption` feature".into(),
        ));
    }
    Ok(ValueCodec::new(format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileBackend;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let dir = tempdir().unwrap();
        let manager = SettingsManagerBuilder::new(FileBackend::new(dir.path().join("s.json")))
            .build()
            .unwrap();

        assert!(!manager.codec().is_encrypting());
        assert_eq!(manager.codec().array_format(), ArrayFormat::Json);
        assert!(manager.cache().is_none());
    }

    #[test]
    fn test_with_config() {
        let dir = tempdir().unwrap();
        let config = SettingsConfig::builder()
            .array_format(ArrayFormat::Csv)
            .cache("my-app", 60)
            .build();

        let manager = SettingsManagerBuilder::new(FileBackend::new(dir.path().join("s.json")))
            .with_config(&config)
            .build()
            .unwrap();

        assert_eq!(manager.codec().array_format(), ArrayFormat::Csv);
        let cache = manager.cache().unwrap();
        assert_eq!(cache.key(), "my-app");
        assert_eq!(cache.ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_config_app_key_ignored_when_encryption_off() {
        let dir = tempdir().unwrap();
        let mut config = SettingsConfig::default();
        config.app_key = Some("unused".into());

        let manager = SettingsManagerBuilder::new(FileBackend::new(dir.path().join("s.json")))
            .with_config(&config)
            .build()
            .unwrap();
        assert!(!manager.codec().is_encrypting());
    }

    #[test]
    fn test_empty_cache_key_rejected() {
        let dir = tempdir().unwrap();
        let result = SettingsManagerBuilder::new(FileBackend::new(dir.path().join("s.json")))
            .cache("", Duration::from_secs(60))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[cfg(feature = "encryption")]
    #[test]
    fn test_encryption_key_enables_codec() {
        let dir = tempdir().unwrap();
        let manager = SettingsManagerBuilder::new(FileBackend::new(dir.path().join("s.json")))
            .encryption_key("secret")
            .build()
            .unwrap();
        assert!(manager.codec().is_encrypting());
    }

    #[cfg(feature = "encryption")]
    #[test]
    fn test_invalid_encryption_key_rejected() {
        let dir = tempdir().unwrap();
        let result = SettingsManagerBuilder::new(FileBackend::new(dir.path().join("s.json")))
            .encryption_key("base64:tooshort")
            .build();
        assert!(result.is_err());
    }
}
