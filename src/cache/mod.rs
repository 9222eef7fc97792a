// In-memory TTL cache for catalog reads

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
    generation: u64,
}

impl CacheEntry {
    fn new(value: String, ttl: Option<Duration>, generation: u64) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
            generation,
        }
    }

    fn is_expired(&self) -> bool {
        if let Some(expires_at) = self.expires_at {
            Instant::now() > expires_at
        } else {
            false
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation != generation || self.is_expired()
    }
}

/// Serialized values keyed by string, each with an optional time-to-live.
///
/// A cache built with [`InMemoryCache::disabled`] accepts writes and never
/// returns a hit.
///
/// Every [`clear`](InMemoryCache::clear) starts a new generation. Entries are
/// stamped with the generation their value was loaded under, and an entry
/// from an earlier generation is a miss, so a value read from the store
/// before a clear can never be served after it.
#[derive(Debug, Clone)]
pub struct InMemoryCache {
    store: Arc<DashMap<String, CacheEntry>>,
    generation: Arc<AtomicU64>,
    default_ttl: Option<Duration>,
    enabled: bool,
}

impl InMemoryCache {
    pub fn new(default_ttl: Option<Duration>) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
            default_ttl,
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(None)
        }
    }

    /// Cache for a configured TTL in seconds; zero turns caching off
    pub fn from_ttl_secs(ttl_secs: u64) -> Self {
        if ttl_secs == 0 {
            Self::disabled()
        } else {
            Self::new(Some(Duration::from_secs(ttl_secs)))
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Generation to stamp on a value about to be loaded from the store
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let current = self.generation();
        let stale = match self.store.get(key) {
            Some(entry) if !entry.is_stale(current) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if stale {
            self.store.remove_if(key, |_, entry| entry.is_stale(current));
        }
        None
    }

    pub fn set(&self, key: &str, value: String, ttl: Option<Duration>) {
        self.set_at(key, value, ttl, self.generation());
    }

    /// Stores a value loaded under `generation`; dropped if a clear has happened since
    pub fn set_at(&self, key: &str, value: String, ttl: Option<Duration>, generation: u64) {
        if !self.enabled || generation != self.generation() {
            return;
        }
        let ttl = ttl.or(self.default_ttl);
        self.store
            .insert(key.to_string(), CacheEntry::new(value, ttl, generation));
    }

    pub fn delete(&self, key: &str) {
        self.store.remove(key);
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.store.clear();
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Typed read; an undecodable entry is dropped and reported as a miss
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "discarding undecodable cache entry");
                self.delete(key);
                None
            }
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.set_json_at(key, value, self.generation())
    }

    pub fn set_json_at<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        generation: u64,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        self.set_at(key, raw, None, generation);
        Ok(())
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(Some(Duration::from_secs(60)))
    }
}
