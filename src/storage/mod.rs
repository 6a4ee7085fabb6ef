//! Storage backend trait and implementations
//!
//! A backend persists the flat key/value namespace. It knows nothing about
//! encryption or caching; it only stores and returns values in their stored
//! form.

mod file;
#[cfg(feature = "database")]
mod table;

pub use file::FileBackend;
#[cfg(feature = "database")]
pub use table::TableBackend;

use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Every stored key with its value
pub type Snapshot = HashMap<String, Value>;

/// Trait for storage backend implementations
///
/// Both bundled backends satisfy the same contract:
///
/// - `all` decodes structured values that were JSON-encoded on write
/// - `get` is derived from `all` so decoding never diverges
/// - `forget` and `clear` are idempotent
/// - `has` agrees with whether `get` would fall back to its default
pub trait StorageBackend: Send + Sync {
    /// Short name used in log output (e.g. "file", "table")
    fn backend_name(&self) -> &'static str;

    /// Read every stored setting
    fn all(&self) -> Result<Snapshot>;

    /// Read one setting, falling back to `default` when absent
    fn get(&self, key: &str, default: Value) -> Result<Value> {
        Ok(self.all()?.remove(key).unwrap_or(default))
    }

    /// Insert or replace one setting
    fn set(&self, key: &str, value: &Value) -> Result<()>;

    /// Remove one setting (no error if absent)
    fn forget(&self, key: &str) -> Result<()>;

    /// Remove every setting
    fn clear(&self) -> Result<()>;

    /// Check whether a setting exists
    fn has(&self, key: &str) -> Result<bool> {
        Ok(self.all()?.contains_key(key))
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }

    fn all(&self) -> Result<Snapshot> {
        (**self).all()
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        (**self).set(key, value)
    }

    fn forget(&self, key: &str) -> Result<()> {
        (**self).forget(key)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }

    fn has(&self, key: &str) -> Result<bool> {
        (**self).has(key)
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for Arc<B> {
    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }

    fn all(&self) -> Result<Snapshot> {
        (**self).all()
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        (**self).set(key, value)
    }

    fn forget(&self, key: &str) -> Result<()> {
        (**self).forget(key)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }

    fn has(&self, key: &str) -> Result<bool> {
        (**self).has(key)
    }
}

/// Replace a leading `~` with the home directory
pub(crate) fn expand_home(path: PathBuf) -> PathBuf {
    if path.starts_with("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(path.strip_prefix("~").unwrap_or(&path));
        }
    }
    path
}

/// Decode a stored text value the way the table backend reads it back
///
/// Anything that parses as JSON is returned decoded, everything else is
/// returned as an opaque string. A scalar like `"123"` therefore comes back
/// as the number `123`.
#[cfg(feature = "database")]
pub(crate) fn decode_stored_text(text: String) -> Value {
    match serde_json::from_str::<Value>(&text) {
        Ok(decoded) => decoded,
        Err(_) => Value::String(text),
    }
}

/// Encode a value into the text form the table backend stores
#[cfg(feature = "database")]
pub(crate) fn encode_stored_text(value: &Value) -> Result<Option<String>> {
    Ok(match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => Some(serde_json::to_string(value)?),
    })
}

// =============================================================================
// Tests
// =============================================================================
