//! Durable Cache Module
//!
//! TTL-bounded snapshots of reference data (doctor lists, medicine
//! substitutes) kept in memory and written through to the storage substrate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{CacheEnvelope, CacheStats, CACHE_KEY_PREFIX, MAX_KEY_LENGTH};
use crate::clock::Clock;
use crate::error::{OfflineError, Result};
use crate::storage::Storage;

// == Durable Cache ==
/// Write-through cache with lazy, read-time expiry.
#[derive(Debug)]
pub struct DurableCache {
    /// In-process copy, authoritative for read-your-write
    entries: HashMap<String, CacheEnvelope>,
    /// Persistence substrate
    storage: Arc<dyn Storage>,
    /// Timestamp source
    clock: Arc<dyn Clock>,
    /// Age at which an entry reads as absent
    ttl: Duration,
    /// Performance statistics
    stats: CacheStats,
}

impl DurableCache {
    // == Constructor ==
    /// Creates a cache over `storage`. Entries already in the substrate are
    /// loaded lazily on first read.
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            storage,
            clock,
            ttl,
            stats: CacheStats::new(),
        }
    }

    // == Cache Data ==
    /// Stores `payload` under `key`, replacing any previous snapshot.
    ///
    /// The in-memory copy is updated before persisting, so a rejected write
    /// still serves reads for the lifetime of this instance. A rejected write
    /// returns `OfflineError::Storage`; callers decide whether to surface it.
    pub fn cache_data<T: Serialize + ?Sized>(&mut self, key: &str, payload: &T) -> Result<()> {
        validate_key(key)?;

        let data = serde_json::to_value(payload)?;
        let envelope = CacheEnvelope::new(data, self.clock.now_ms());
        let serialized = serde_json::to_string(&envelope)?;

        self.entries.insert(key.to_string(), envelope);
        self.stats.set_total_entries(self.entries.len());

        if let Err(e) = self.storage.set(&storage_key(key), &serialized) {
            self.stats.record_write_failure();
            warn!("Cache write for '{}' not persisted: {}", key, e);
            return Err(OfflineError::Storage(e.to_string()));
        }

        debug!("Cached '{}' ({} bytes)", key, serialized.len());
        Ok(())
    }

    // == Get Cached Data ==
    /// Returns the cached payload for `key`.
    ///
    /// Absent, unreadable, mistyped and expired entries all read as `None`;
    /// absence is an expected outcome, not an error.
    pub fn get_cached_data<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let Some(envelope) = self.lookup(key) else {
            self.stats.record_miss();
            return None;
        };

        if envelope.is_expired_at(self.clock.now_ms(), self.ttl) {
            debug!("Cache entry '{}' expired", key);
            self.stats.record_expired();
            return None;
        }

        match serde_json::from_value(envelope.data) {
            Ok(value) => {
                self.stats.record_hit();
                Some(value)
            }
            Err(e) => {
                warn!("Cache entry '{}' has unexpected shape: {}", key, e);
                self.stats.record_miss();
                None
            }
        }
    }

    /// Memory first, then the substrate (restart recovery).
    fn lookup(&mut self, key: &str) -> Option<CacheEnvelope> {
        if let Some(envelope) = self.entries.get(key) {
            return Some(envelope.clone());
        }

        let raw = match self.storage.get(&storage_key(key)) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Cache read for '{}' failed: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str::<CacheEnvelope>(&raw) {
            Ok(envelope) => {
                self.entries.insert(key.to_string(), envelope.clone());
                self.stats.set_total_entries(self.entries.len());
                Some(envelope)
            }
            Err(e) => {
                warn!("Cache entry '{}' is corrupt: {}", key, e);
                None
            }
        }
    }

    // == Remove ==
    /// Drops `key` from memory and the substrate.
    pub fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        self.stats.set_total_entries(self.entries.len());
        self.storage.remove(&storage_key(key))
    }

    // == Purge Expired ==
    /// Physically removes every expired entry, in memory and persisted.
    ///
    /// Returns the number of distinct keys removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let ttl = self.ttl;

        let mut expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, envelope)| envelope.is_expired_at(now, ttl))
            .map(|(key, _)| key.clone())
            .collect();

        match self.storage.keys_with_prefix(CACHE_KEY_PREFIX) {
            Ok(keys) => {
                for stored in keys {
                    let key = &stored[CACHE_KEY_PREFIX.len()..];
                    if self.entries.contains_key(key) {
                        continue;
                    }
                    let stale = match self.storage.get(&stored) {
                        Ok(Some(raw)) => serde_json::from_str::<CacheEnvelope>(&raw)
                            .map(|e| e.is_expired_at(now, ttl))
                            .unwrap_or(true),
                        _ => false,
                    };
                    if stale {
                        expired.push(key.to_string());
                    }
                }
            }
            Err(e) => warn!("Cache sweep could not list stored keys: {}", e),
        }

        let count = expired.len();
        for key in expired {
            if let Err(e) = self.remove(&key) {
                warn!("Cache sweep could not remove '{}': {}", key, e);
            }
        }
        count
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Returns the number of entries held in memory.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn storage_key(key: &str) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, key)
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(OfflineError::InvalidRequest(
            "Cache key cannot be empty".to_string(),
        ));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(OfflineError::InvalidRequest(format!(
            "Cache key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
