use crate::error::{Error, Result};
use crate::storage::{Snapshot, StorageBackend};

use super::SettingsManager;
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

impl<S: StorageBackend> SettingsManager<S> {
    /// Get every setting, decrypted.
    ///
    /// Served from the cache when enabled and warm. Arrays are never rendered
    /// here; only single-key reads apply the array format.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn all(&self) -> Result<Snapshot> {
        match &self.cache {
            Some(cache) => cache.remember(|| self.load_snapshot()),
            None => self.load_snapshot(),
        }
    }

    /// Get a single setting.
    ///
    /// Returns `None` if the key is not stored. Arrays and objects are
    /// rendered in the configured array format.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or rendering fails.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        match self.all()?.remove(key) {
            Some(value) => self.finish_read(value).map(Some),
            None => Ok(None),
        }
    }

    /// Get a single setting, or `default` when it is not stored.
    ///
    /// The default goes through the same decrypt/render steps as a stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or rendering fails.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Result<Value> {
        let value = self.all()?.remove(key).unwrap_or_else(|| default.into());
        self.finish_read(value)
    }

    /// Get a single setting deserialized into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the value cannot be deserialized.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)?
            .map(|value| {
                serde_json::from_value(value).map_err(|e| Error::TypeMismatch {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Store a setting, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty, the value is `null`, encryption
    /// fails or the backend write fails. The cache is only invalidated after
    /// the backend write succeeded.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        validate_key(key)?;
        if value.is_null() {
            return Err(Error::InvalidValue {
                key: key.to_string(),
                reason: "null cannot be stored, use forget() to remove a setting".into(),
            });
        }

        let stored = self.codec.encrypt(&value)?;
        self.backend.set(key, &stored)?;
        self.invalidate_cache();

        debug!("Setting '{key}' saved via {} backend", self.backend.backend_name());
        Ok(())
    }

    /// Store several settings.
    ///
    /// Entries are written one by one; on failure the entries before the
    /// failing one stay written.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.
    pub fn set_many<I, K, V>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.set(key.as_ref(), value)?;
        }
        Ok(())
    }

    /// Remove a setting. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn forget(&self, key: &str) -> Result<()> {
        self.backend.forget(key)?;
        self.invalidate_cache();

        debug!("Setting '{key}' forgotten");
        Ok(())
    }

    /// Remove every setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn clear(&self) -> Result<()> {
        self.backend.clear()?;
        self.invalidate_cache();

        debug!("All settings cleared");
        Ok(())
    }

    /// Check whether a setting is stored.
    ///
    /// Asks the backend directly, bypassing the cache and decryption.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn has(&self, key: &str) -> Result<bool> {
        self.backend.has(key)
    }

    /// Evict the cached snapshot.
    ///
    /// Call this if the store was modified by another process.
    pub fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate();
        }
    }

    fn load_snapshot(&self) -> Result<Snapshot> {
        let snapshot = self.backend.all()?;
        Ok(self.codec.decrypt_snapshot(snapshot))
    }

    /// Second decrypt pass (a no-op on plaintext, which fails open), then render
    fn finish_read(&self, value: Value) -> Result<Value> {
        let value = self.codec.decrypt(value).into_value();
        self.codec.render(value)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidKey("setting key must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ArrayFormat;
    use crate::storage::FileBackend;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::tempdir;

    fn manager(dir: &tempfile::TempDir) -> SettingsManager<FileBackend> {
        SettingsManager::new(FileBackend::new(dir.path().join("settings.json")))
    }

    #[test]
    fn test_set_get_forget() {
        let dir = tempdir().unwrap();
        let manager = manager(&dir);

        manager.set("site_name", "Acme").unwrap();
        assert_eq!(manager.get("site_name").unwrap(), Some(json!("Acme")));
        assert!(manager.has("site_name").unwrap());

        manager.forget("site_name").unwrap();
        assert!(!manager.has("site_name").unwrap());
        assert_eq!(manager.get("site_name").unwrap(), None);
    }

    #[test]
    fn test_get_or_default() {
        let dir = tempdir().unwrap();
        let manager = manager(&dir);

        assert_eq!(manager.get_or("missing", "fallback").unwrap(), json!("fallback"));
        manager.set("present", 5).unwrap();
        assert_eq!(manager.get_or("present", 0).unwrap(), json!(5));
    }

    #[test]
    fn test_default_is_rendered_too() {
        let dir = tempdir().unwrap();
        let manager = SettingsManager::builder(FileBackend::new(dir.path().join("s.json")))
            .array_format(ArrayFormat::Csv)
            .build()
            .unwrap();

        assert_eq!(manager.get_or("tags", json!(["x", "y"])).unwrap(), json!("x,y"));
    }

    #[test]
    fn test_get_as() {
        let dir = tempdir().unwrap();
        let manager = manager(&dir);
        manager.set("limits", json!([1, 2, 3])).unwrap();

        let limits: Option<Vec<u32>> = manager.get_as("limits").unwrap();
        assert_eq!(limits, Some(vec![1, 2, 3]));

        let missing: Option<String> = manager.get_as("nothing").unwrap();
        assert_eq!(missing, None);

        let err = manager.get_as::<String>("limits").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_rejects_empty_key_and_null() {
        let dir = tempdir().unwrap();
        let manager = manager(&dir);

        assert!(matches!(manager.set("", "x"), Err(Error::InvalidKey(_))));
        assert!(matches!(
            manager.set("a", Value::Null),
            Err(Error::InvalidValue { .. })
        ));
        assert!(manager.all().unwrap().is_empty());
    }

    #[test]
    fn test_set_many() {
        let dir = tempdir().unwrap();
        let manager = manager(&dir);

        manager
            .set_many([("a", json!(1)), ("b", json!("two"))])
            .unwrap();

        let all = manager.all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["a"], json!(1));
        assert_eq!(all["b"], json!("two"));
    }

    #[test]
    fn test_set_many_stops_at_first_failure() {
        let dir = tempdir().unwrap();
        let manager = manager(&dir);

        let result = manager.set_many([("a", json!(1)), ("", json!(2)), ("c", json!(3))]);
        assert!(result.is_err());

        let all = manager.all().unwrap();
        assert!(all.contains_key("a"));
        assert!(!all.contains_key("c"));
    }

    #[test]
    fn test_cache_invalidated_by_set() {
        let dir = tempdir().unwrap();
        let manager = SettingsManager::builder(FileBackend::new(dir.path().join("s.json")))
            .cache("test", Duration::from_secs(3600))
            .build()
            .unwrap();

        manager.set("k", "v1").unwrap();
        assert_eq!(manager.get("k").unwrap(), Some(json!("v1")));

        manager.set("k", "v2").unwrap();
        assert_eq!(manager.get("k").unwrap(), Some(json!("v2")));
    }

    #[test]
    fn test_all_does_not_render() {
        let dir = tempdir().unwrap();
        let manager = SettingsManager::builder(FileBackend::new(dir.path().join("s.json")))
            .array_format(ArrayFormat::Csv)
            .build()
            .unwrap();

        manager.set("tags", json!(["a", "b"])).unwrap();
        assert_eq!(manager.all().unwrap()["tags"], json!(["a", "b"]));
        assert_eq!(manager.get("tags").unwrap(), Some(json!("a,b")));
    }
}
