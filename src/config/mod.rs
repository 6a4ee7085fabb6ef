//! Configuration types
//!
//! - `SettingsConfig` - backend selection, encryption, array format and cache options
//! - `EnvSource` - environment lookup used for `{PREFIX}_*` overrides

mod types;

pub use types::{
    CacheConfig, DatabaseConfig, DefaultEnvSource, Driver, EnvSource, FileConfig, SettingsConfig,
    SettingsConfigBuilder,
};
