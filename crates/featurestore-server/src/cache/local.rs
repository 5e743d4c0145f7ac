//! Bounded, time-expiring in-process feature cache (L1).
//!
//! ## Eviction
//!
//! Entries are evicted least-recently-written first. Every `set` stamps the
//! entry with a fresh sequence number; inserting a new key into a full cache
//! drops the entry with the smallest stamp. All entries share one TTL, so the
//! oldest write is also the entry closest to expiry.
//!
//! ## Locking
//!
//! The key space sits behind a `parking_lot::RwLock`. `get` only takes the
//! read lock and never reorders entries, so lookups run concurrently. Hit and
//! miss counters are atomics outside the lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use featurestore_core::{CacheKey, FeatureSet, TierCounters, TierStats};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Shortest sweep period; shorter intervals are raised to it.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Cached entry with expiration time.
struct CacheEntry {
    features: Arc<FeatureSet>,
    expires_at: Instant,
    /// Write stamp, also the entry's key in `Entries::order`.
    seq: u64,
}

#[derive(Default)]
struct Entries {
    map: HashMap<CacheKey, CacheEntry>,
    /// Write stamp -> key, oldest first.
    order: BTreeMap<u64, CacheKey>,
    next_seq: u64,
}

/// Statistics of the local cache.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocalCacheStats {
    /// Entries currently stored, including expired ones not yet swept.
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped to make room for new keys.
    pub evictions: u64,
    /// Entries removed by the expiry sweep.
    pub expired: u64,
}

impl LocalCacheStats {
    pub fn hit_rate(&self) -> f64 {
        TierStats {
            hits: self.hits,
            misses: self.misses,
        }
        .hit_rate()
    }
}

/// In-process L1 cache mapping [`CacheKey`]s to feature set snapshots.
pub struct LocalCache {
    entries: RwLock<Entries>,
    ttl: Duration,
    capacity: usize,
    counters: TierCounters,
    evictions: AtomicU64,
    expired: AtomicU64,
}

impl LocalCache {
    /// Create a cache holding at most `capacity` entries for `ttl` each.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            ttl,
            capacity: capacity.max(1),
            counters: TierCounters::new(),
            evictions: AtomicU64::new(0),
            expired: AtomicU64::new(0),
        }
    }

    /// Snapshot stored under `key`, unless absent or expired.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<FeatureSet>> {
        let now = Instant::now();
        let found = {
            let entries = self.entries.read();
            entries
                .map
                .get(key)
                .filter(|entry| now < entry.expires_at)
                .map(|entry| Arc::clone(&entry.features))
        };

        match found {
            Some(_) => self.counters.record_hit(),
            None => self.counters.record_miss(),
        }
        found
    }

    /// Insert or overwrite `key`, expiring `ttl` from now.
    ///
    /// Inserting a new key into a full cache first evicts exactly one entry,
    /// the least recently written.
    pub fn set(&self, key: CacheKey, features: FeatureSet) {
        let features = Arc::new(features);
        let mut guard = self.entries.write();
        let entries = &mut *guard;

        let seq = entries.next_seq;
        entries.next_seq += 1;
        let expires_at = Instant::now() + self.ttl;

        if let Some(existing) = entries.map.get_mut(&key) {
            let previous = std::mem::replace(&mut existing.seq, seq);
            existing.features = features;
            existing.expires_at = expires_at;
            entries.order.remove(&previous);
            entries.order.insert(seq, key);
            return;
        }

        if entries.map.len() >= self.capacity
            && let Some((_, oldest)) = entries.order.pop_first()
        {
            entries.map.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(key = %oldest, "evicted local cache entry");
        }

        entries.order.insert(seq, key.clone());
        entries.map.insert(
            key,
            CacheEntry {
                features,
                expires_at,
                seq,
            },
        );
    }

    /// Remove `key`. Returns whether an entry was present.
    pub fn delete(&self, key: &CacheKey) -> bool {
        let mut guard = self.entries.write();
        let entries = &mut *guard;
        match entries.map.remove(key) {
            Some(entry) => {
                entries.order.remove(&entry.seq);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.map.clear();
        entries.order.clear();
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn size(&self) -> usize {
        self.entries.read().map.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fraction of `get` calls that hit, in `[0, 1]`.
    pub fn hit_rate(&self) -> f64 {
        self.counters.hit_rate()
    }

    pub fn stats(&self) -> LocalCacheStats {
        let counters = self.counters.snapshot();
        LocalCacheStats {
            size: self.size(),
            capacity: self.capacity,
            hits: counters.hits,
            misses: counters.misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }

    /// Remove every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.entries.write();
        let entries = &mut *guard;
        let mut removed = 0;

        // Uniform TTL: write order is expiry order, so expired entries form a
        // prefix of `order`.
        while let Some((&seq, key)) = entries.order.first_key_value() {
            let expired = entries
                .map
                .get(key)
                .is_none_or(|entry| entry.expires_at <= now);
            if !expired {
                break;
            }
            if let Some(key) = entries.order.remove(&seq) {
                entries.map.remove(&key);
            }
            removed += 1;
        }

        if removed > 0 {
            self.expired.fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    /// Spawn the periodic expiry sweep.
    ///
    /// The task holds only a weak reference to the cache and stops when
    /// `shutdown` is cancelled or the cache is dropped. An `interval` below one
    /// millisecond is raised to one millisecond. Must be called from within a
    /// tokio runtime.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_ms = interval.as_millis() as u64, "local cache sweeper started");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(cache) = cache.upgrade() else { break };
                        let removed = cache.purge_expired();
                        if removed > 0 {
                            tracing::debug!(removed, remaining = cache.size(), "swept expired local cache entries");
                        }
                    }
                }
            }

            tracing::info!("local cache sweeper stopped");
        })
    }
}
