//! LRU cache of materialized validation record lists
//!
//! Keyed by snapshot id; values are the fully materialized full rows (not
//! the lightweight projection), shared as read-only `Arc`s. One read-write
//! lock protects the ordered map. Reads are optimistic: a hit is served
//! under the read lock via `peek`, refreshing the entry's idle timestamp
//! through an atomic; only a miss or an expired entry escalates to the
//! write lock, where the lookup is double-checked so concurrent misses
//! load once. Access-order promotion happens under the write lock;
//! eviction happens during insertion via the capacity bound; the idle TTL
//! is enforced at read time. Writers into a snapshot must call
//! `invalidate`.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::RwLock;
use tracing::debug;

use oaistore_core::{RecordValidation, Result, SnapshotId, StoreConfig};

struct CacheEntry {
    records: Arc<Vec<RecordValidation>>,
    /// Milliseconds since the cache epoch; atomic so a shared-lock read
    /// can refresh it
    last_access_ms: AtomicU64,
}

impl CacheEntry {
    fn new(records: Arc<Vec<RecordValidation>>, now_ms: u64) -> Self {
        CacheEntry {
            records,
            last_access_ms: AtomicU64::new(now_ms),
        }
    }

    fn touch(&self, now_ms: u64) {
        self.last_access_ms.store(now_ms, Ordering::Relaxed);
    }
}

/// Snapshot-keyed LRU of validation record lists
pub struct ValidationCache {
    entries: RwLock<LruCache<SnapshotId, CacheEntry>>,
    ttl_ms: u64,
    epoch: Instant,
}

impl ValidationCache {
    /// Create a cache from the configured capacity and TTL
    ///
    /// The documented minimum capacity (5 snapshots) is enforced here.
    pub fn new(config: &StoreConfig) -> Self {
        let capacity = NonZeroUsize::new(config.effective_cache_capacity())
            .expect("cache capacity is at least the enforced minimum");
        ValidationCache {
            entries: RwLock::new(LruCache::new(capacity)),
            ttl_ms: Duration::from_secs(config.cache_ttl_minutes * 60).as_millis() as u64,
            epoch: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn is_fresh(&self, entry: &CacheEntry, now_ms: u64) -> bool {
        now_ms.saturating_sub(entry.last_access_ms.load(Ordering::Relaxed)) < self.ttl_ms
    }

    /// Get the snapshot's records, loading on miss
    ///
    /// A fresh entry is returned from the read-lock fast path. On a miss
    /// (or an entry idle past the TTL) the call escalates to the write
    /// lock, double-checks, and runs the loader there so one load serves
    /// every concurrent miss. Returned lists are read-only.
    pub fn get_or_load<F>(&self, id: SnapshotId, loader: F) -> Result<Arc<Vec<RecordValidation>>>
    where
        F: FnOnce() -> Result<Vec<RecordValidation>>,
    {
        {
            let entries = self.entries.read();
            if let Some(entry) = entries.peek(&id) {
                let now = self.now_ms();
                if self.is_fresh(entry, now) {
                    entry.touch(now);
                    return Ok(entry.records.clone());
                }
            }
        }

        let mut entries = self.entries.write();
        // Double-check: another thread may have loaded while we waited
        if let Some(entry) = entries.get_mut(&id) {
            let now = self.now_ms();
            if self.is_fresh(entry, now) {
                entry.touch(now);
                return Ok(entry.records.clone());
            }
            debug!(snapshot = id, "cache entry expired");
            entries.pop(&id);
        }

        let records = Arc::new(loader()?);
        entries.put(id, CacheEntry::new(records.clone(), self.now_ms()));
        debug!(snapshot = id, rows = records.len(), "cached validation records");
        Ok(records)
    }

    /// Drop the snapshot's entry (writers call this after every write)
    pub fn invalidate(&self, id: SnapshotId) {
        self.entries.write().pop(&id);
    }

    /// Whether a snapshot currently has a live entry
    pub fn contains(&self, id: SnapshotId) -> bool {
        self.entries.read().peek(&id).is_some()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
