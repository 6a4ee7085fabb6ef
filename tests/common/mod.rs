//! Common test utilities for settings-store integration tests
//!
//! Provides shared fixtures, a backend wrapper that counts reads, and raw file
//! helpers.

#![allow(dead_code)]

use serde_json::Value;
use settings_store::{FileBackend, Result, SettingsManager, Snapshot, StorageBackend};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Route `log` output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// =============================================================================
// Counting Backend
// =============================================================================

/// Backend wrapper counting how often the full snapshot is read
pub struct CountingBackend<B: StorageBackend> {
    inner: B,
    reads: AtomicUsize,
}

impl<B: StorageBackend> CountingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    /// Number of `all()` calls so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl<B: StorageBackend> StorageBackend for CountingBackend<B> {
    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    fn all(&self) -> Result<Snapshot> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.all()
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        self.inner.set(key, value)
    }

    fn forget(&self, key: &str) -> Result<()> {
        self.inner.forget(key)
    }

    fn clear(&self) -> Result<()> {
        self.inner.clear()
    }

    fn has(&self, key: &str) -> Result<bool> {
        self.inner.has(key)
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

/// Temporary directory with a file-backed manager
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub manager: SettingsManager<FileBackend>,
}

impl TestFixture {
    /// Plain manager: no encryption, no cache, json arrays
    pub fn new() -> Self {
        init_logging();
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let manager = SettingsManager::new(FileBackend::new(temp_dir.path().join("settings.json")));

        Self { temp_dir, manager }
    }

    /// Get the settings file path
    pub fn settings_path(&self) -> PathBuf {
        self.temp_dir.path().join("settings.json")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Temporary directory with a cached manager whose backend reads are counted
pub struct CachedFixture {
    pub temp_dir: TempDir,
    pub backend: Arc<CountingBackend<FileBackend>>,
    pub manager: SettingsManager<Arc<CountingBackend<FileBackend>>>,
}

impl CachedFixture {
    pub fn new(ttl: Duration) -> Self {
        init_logging();
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let backend = Arc::new(CountingBackend::new(FileBackend::new(
            temp_dir.path().join("settings.json"),
        )));
        let manager = SettingsManager::builder(Arc::clone(&backend))
            .cache("test-settings", ttl)
            .build()
            .expect("Failed to build manager");

        Self {
            temp_dir,
            backend,
            manager,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Read the raw settings JSON file content
pub fn read_settings_file(path: &std::path::Path) -> Option<Value> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Check if a key exists in the settings JSON file
pub fn key_exists_in_file(path: &std::path::Path, key: &str) -> bool {
    read_settings_file(path)
        .map(|json| json.get(key).is_some())
        .unwrap_or(false)
}
