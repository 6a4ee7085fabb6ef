//! Main settings manager module
//!
//! This module contains the [`SettingsManager`] struct which is the single
//! public surface over a storage backend, the value codec and the optional
//! snapshot cache.

mod builder;
mod operations;

pub use builder::SettingsManagerBuilder;

use crate::cache::SettingsCache;
use crate::codec::ValueCodec;
use crate::config::{Driver, SettingsConfig};
use crate::error::Result;
use crate::storage::{FileBackend, StorageBackend};

/// Settings manager for reading and writing application settings.
///
/// - **Read**: `all`/`get` go through the cache (if enabled), the backend and decryption
/// - **Write**: `set` encrypts (if enabled) before the backend sees the value
/// - **Invalidate**: every successful mutation evicts the cached snapshot
///
/// # Example
///
/// ```rust,no_run
/// use settings_store::{SettingsManager, storage::FileBackend};
/// use std::time::Duration;
///
/// let manager = SettingsManager::builder(FileBackend::new("~/.config/my-app/settings.json"))
///     .cache("my-app-settings", Duration::from_secs(3600))
///     .build()?;
///
/// manager.set("site_name", "Acme")?;
/// assert_eq!(manager.get("site_name")?, Some("Acme".into()));
/// # Ok::<(), settings_store::Error>(())
/// ```
///
/// # Type Parameters
///
/// * `S`: The storage backend (defaults to a boxed backend chosen at runtime).
pub struct SettingsManager<S: StorageBackend = Box<dyn StorageBackend>> {
    /// Storage backend
    backend: S,

    /// Encryption and array rendering
    codec: ValueCodec,

    /// Snapshot cache (None when caching is disabled)
    cache: Option<SettingsCache>,
}

/// Settings manager whose backend is chosen at runtime from a [`SettingsConfig`].
pub type DynamicManager = SettingsManager<Box<dyn StorageBackend>>;

impl<S: StorageBackend> SettingsManager<S> {
    /// Create a manager without encryption or caching, rendering arrays as JSON
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            codec: ValueCodec::default(),
            cache: None,
        }
    }

    /// Create a builder for `SettingsManager` with a fluent API.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use settings_store::{ArrayFormat, SettingsManager, storage::FileBackend};
    ///
    /// let manager = SettingsManager::builder(FileBackend::new("settings.json"))
    ///     .encryption_key("my-app-secret")
    ///     .array_format(ArrayFormat::Csv)
    ///     .build()?;
    /// # Ok::<(), settings_store::Error>(())
    /// ```
    pub fn builder(backend: S) -> SettingsManagerBuilder<S> {
        SettingsManagerBuilder::new(backend)
    }

    /// Get the storage backend
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Get the value codec
    pub fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    /// Get the snapshot cache, if caching is enabled
    pub fn cache(&self) -> Option<&SettingsCache> {
        self.cache.as_ref()
    }
}

impl DynamicManager {
    /// Open the configured backend and build a manager from a config.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, the backend cannot be opened,
    /// or the configured features were compiled out.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use settings_store::{SettingsConfig, SettingsManager};
    ///
    /// let config = SettingsConfig::load("config/settings.json")?
    ///     .with_env_overrides("SETTINGS")?;
    /// let manager = SettingsManager::from_config(&config)?;
    /// # Ok::<(), settings_store::Error>(())
    /// ```
    pub fn from_config(config: &SettingsConfig) -> Result<Self> {
        config.validate()?;

        let backend: Box<dyn StorageBackend> = match config.driver {
            Driver::File => Box::new(FileBackend::new(&config.file.path)),
            #[cfg(feature = "database")]
            Driver::Database => Box::new(crate::storage::TableBackend::open(
                &config.database.path,
                config.database.table.clone(),
            )?),
            #[cfg(not(feature = "database"))]
            Driver::Database => {
                return Err(crate::Error::Config(
                    "The database driver requires the `database` feature".into(),
                ));
            }
        };

        SettingsManagerBuilder::new(backend).with_config(config).build()
    }
}

impl<S: StorageBackend> std::fmt::Debug for SettingsManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsManager")
            .field("backend", &self.backend.backend_name())
            .field("codec", &self.codec)
            .field("cache", &self.cache)
            .finish()
    }
}
