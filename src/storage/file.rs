//! JSON document backend
//!
//! All settings live in one pretty-printed JSON object. Every mutation loads
//! the whole document, changes it in memory and writes it back.

use super::{Snapshot, StorageBackend, expand_home};
use crate::error::{Error, Result};
use crate::security;
use log::debug;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File-based storage backend (single JSON document)
pub struct FileBackend {
    path: PathBuf,
    /// Pretty print JSON output
    pretty: bool,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Create a backend for the document at `path`
    ///
    /// Supports `~` expansion for the home directory. The file is not
    /// created until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: expand_home(path.into()),
            pretty: true,
            write_lock: Mutex::new(()),
        }
    }

    /// Write compact JSON instead of pretty-printed JSON
    #[must_use]
    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    /// Path of the settings document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = crate::error::read_file(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        let document: Value =
            serde_json::from_str(&content).map_err(|e| Error::MalformedDocument {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        match document {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            other => Err(Error::MalformedDocument {
                path: self.path.clone(),
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }

    /// Write the document atomically: temp file in the same directory, then rename
    fn save(&self, settings: &Map<String, Value>) -> Result<()> {
        let content = if self.pretty {
            serde_json::to_string_pretty(settings)?
        } else {
            serde_json::to_string(settings)?
        };

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.exists() {
            security::ensure_secure_dir(&parent)?;
        }

        let write_err = |e: std::io::Error| Error::FileWrite {
            path: self.path.clone(),
            source: e,
        };

        let mut temp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
        temp.write_all(content.as_bytes()).map_err(write_err)?;
        temp.persist(&self.path).map_err(|e| write_err(e.error))?;

        security::set_secure_file_permissions(&self.path)
    }

    fn modify<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let _guard = self.write_lock.lock();
        let mut settings = self.load()?;
        mutate(&mut settings);
        self.save(&settings)
    }
}

impl StorageBackend for FileBackend {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    fn all(&self) -> Result<Snapshot> {
        Ok(self.load()?.into_iter().collect())
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        self.modify(|settings| {
            settings.insert(key.to_string(), value.clone());
        })?;
        debug!("Setting '{key}' written to {}", self.path.display());
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<()> {
        self.modify(|settings| {
            settings.remove(key);
        })?;
        debug!("Setting '{key}' removed from {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.save(&Map::new())?;
        debug!("All settings cleared in {}", self.path.display());
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// Tests
// =============================================================================
