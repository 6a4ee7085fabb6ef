//! # settings-store - Persistent Application Settings
//!
//! A small library for storing application settings as key/value pairs in a
//! JSON file or a database table, with optional encryption and snapshot caching.
//!
//! ## Features
//!
//! - **Two Backends**: A pretty-printed JSON document or a `key`/`value` table (requires `database` feature)
//! - **Encryption at Rest**: AES-256-GCM per value, derived from an application secret (requires `encryption` feature)
//! - **Fail-Open Reads**: Values that do not decrypt are returned as stored, so plaintext written earlier stays readable
//! - **Array Formats**: Lists and maps read back as JSON, a comma-joined string, or a serialized blob
//! - **Caching**: One decrypted snapshot per cache key, evicted on every mutation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use settings_store::{SettingsManager, storage::FileBackend};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let manager = SettingsManager::builder(FileBackend::new("~/.config/my-app/settings.json"))
//!     .cache("my-app-settings", Duration::from_secs(3600))
//!     .build()?;
//!
//! manager.set("site_name", "Acme")?;
//! manager.set("admins", json!(["ada", "linus"]))?;
//!
//! assert!(manager.has("site_name")?);
//! let name = manager.get_or("site_name", "Untitled")?;
//! # Ok::<(), settings_store::Error>(())
//! ```
//!
//! ## Configuration
//!
//! The backend and codec can be chosen from a [`SettingsConfig`], loaded from a
//! JSON file and overridden by `{PREFIX}_*` environment variables:
//!
//! ```rust,no_run
//! use settings_store::{SettingsConfig, SettingsManager};
//!
//! let config = SettingsConfig::load("config/settings.json")?
//!     .with_env_overrides("SETTINGS")?;
//! let manager = SettingsManager::from_config(&config)?;
//!
//! let all = manager.all()?;
//! # Ok::<(), settings_store::Error>(())
//! ```
//!
//! ## Encryption
//!
//! With encryption enabled every stored string (and every element of a stored
//! list or map) is encrypted before it reaches the backend. Non-string scalars
//! are encrypted as their JSON text and therefore read back as strings.
//!
//! Turning encryption off later does not break reads: ciphertext that can no
//! longer be decrypted is returned as stored.

pub mod cache;
pub mod codec;
pub mod config;
mod error;
mod manager;
pub mod security;
pub mod storage;

// Re-exports from core
pub use error::{Error, Result};
pub use manager::{DynamicManager, SettingsManager, SettingsManagerBuilder};

pub use cache::{CacheStore, MemoryCache, SettingsCache};
pub use codec::{ArrayFormat, Decryption, ValueCodec};
pub use storage::{FileBackend, Snapshot, StorageBackend};

/// AES-256-GCM value encrypter (requires `encryption` feature)
#[cfg(feature = "encryption")]
pub use codec::Encrypter;

/// Table backend (requires `database` feature)
#[cfg(feature = "database")]
pub use storage::TableBackend;

// Re-exports from config
pub use config::{Driver, SettingsConfig, SettingsConfigBuilder};
