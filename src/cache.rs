//! Snapshot caching
//!
//! The manager caches the whole decrypted snapshot under one cache key. The
//! storage behind the key is a [`CacheStore`], so a host application can hand
//! in a store shared with other components; [`MemoryCache`] is the bundled
//! process-local implementation.

use crate::error::Result;
use crate::storage::Snapshot;
use log::debug;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default number of cache keys kept by [`MemoryCache`]
pub const DEFAULT_CAPACITY: usize = 64;

/// Longest time an entry is kept; larger TTLs are clamped to it
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Key/value store for cached snapshots
pub trait CacheStore: Send + Sync {
    /// Get an unexpired snapshot
    fn get(&self, key: &str) -> Option<Snapshot>;

    /// Store a snapshot for `ttl`
    fn put(&self, key: &str, snapshot: Snapshot, ttl: Duration);

    /// Evict a key (no-op if absent)
    fn forget(&self, key: &str);
}

struct CacheEntry {
    snapshot: Snapshot,
    expires_at: Instant,
}

/// In-memory, LRU-bounded cache store with per-entry expiry
pub struct MemoryCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl MemoryCache {
    /// Create a cache holding up to [`DEFAULT_CAPACITY`] keys
    pub fn new() -> Self {
        Self::with_capacity(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }

    /// Create a cache holding up to `capacity` keys
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of keys currently held (expired entries included until touched)
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no key is held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<Snapshot> {
        let mut entries = self.entries.lock();
        match entries.get(key).map(|entry| entry.expires_at > Instant::now()) {
            Some(true) => entries.get(key).map(|entry| entry.snapshot.clone()),
            Some(false) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, snapshot: Snapshot, ttl: Duration) {
        let Some(expires_at) = Instant::now().checked_add(ttl.min(MAX_TTL)) else {
            return;
        };
        self.entries.lock().put(
            key.to_string(),
            CacheEntry {
                snapshot,
                expires_at,
            },
        );
    }

    fn forget(&self, key: &str) {
        self.entries.lock().pop(key);
    }
}

/// Read-through snapshot cache bound to one cache key and TTL
///
/// Every invalidation bumps a generation counter. A snapshot computed while an
/// invalidation happened is returned to its caller but never stored, so a read
/// racing a write cannot put pre-write data back into the cache.
#[derive(Clone)]
pub struct SettingsCache {
    store: Arc<dyn CacheStore>,
    key: String,
    ttl: Duration,
    generation: Arc<Mutex<u64>>,
}

impl SettingsCache {
    /// Cache snapshots under `key` in a private [`MemoryCache`]
    pub fn new(key: impl Into<String>, ttl: Duration) -> Self {
        Self::with_store(Arc::new(MemoryCache::new()), key, ttl)
    }

    /// Cache snapshots under `key` in a shared store
    pub fn with_store(store: Arc<dyn CacheStore>, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            ttl,
            generation: Arc::new(Mutex::new(0)),
        }
    }

    /// The cache key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Time a snapshot stays cached
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached snapshot, or compute, store and return a fresh one
    ///
    /// A failed computation leaves the cache empty. A zero TTL never stores.
    pub fn remember<F>(&self, compute: F) -> Result<Snapshot>
    where
        F: FnOnce() -> Result<Snapshot>,
    {
        if let Some(snapshot) = self.store.get(&self.key) {
            debug!("Settings cache hit for '{}'", self.key);
            return Ok(snapshot);
        }

        debug!("Settings cache miss for '{}'", self.key);
        let started_at = *self.generation.lock();
        let snapshot = compute()?;
        if !self.ttl.is_zero() {
            let generation = self.generation.lock();
            if *generation == started_at {
                self.store.put(&self.key, snapshot.clone(), self.ttl);
            } else {
                debug!(
                    "Settings cache '{}' invalidated during load, snapshot not stored",
                    self.key
                );
            }
        }
        Ok(snapshot)
    }

    /// Evict the cached snapshot
    pub fn invalidate(&self) {
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        self.store.forget(&self.key);
        drop(generation);
        debug!("Settings cache '{}' invalidated", self.key);
    }
}

impl std::fmt::Debug for SettingsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsCache")
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .finish()
    }
}
