//! In-memory tiers for driving the resolver without Redis or PostgreSQL.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use featurestore_core::{
    FeatureName, OfflineStore, RemoteCache, RemoteValues, TierCounters, TierError, TierStats,
};
use featurestore_server::Resolver;
use featurestore_server::cache::LocalCache;
use parking_lot::Mutex;

/// Remote cache fake keyed by `(entity_id, feature)`.
#[derive(Default)]
pub struct FakeRemoteCache {
    values: Mutex<HashMap<(String, String), String>>,
    latency: Mutex<HashMap<String, Duration>>,
    failing: Mutex<HashSet<String>>,
    down: Mutex<bool>,
    counters: TierCounters,
    calls: AtomicUsize,
    requested: Mutex<Vec<Vec<FeatureName>>>,
    completed: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeRemoteCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, entity_id: &str, feature: &str, raw: &str) {
        self.values
            .lock()
            .insert((entity_id.to_string(), feature.to_string()), raw.to_string());
    }

    /// Delay every lookup for `entity_id`.
    pub fn delay(&self, entity_id: &str, latency: Duration) {
        self.latency.lock().insert(entity_id.to_string(), latency);
    }

    /// Fail every lookup for `entity_id` as unreachable.
    pub fn fail_for(&self, entity_id: &str) {
        self.failing.lock().insert(entity_id.to_string());
    }

    pub fn set_down(&self, down: bool) {
        *self.down.lock() = down;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Feature lists of every `get_many` call, in call order.
    pub fn requested(&self) -> Vec<Vec<FeatureName>> {
        self.requested.lock().clone()
    }

    /// Entity ids in the order their lookups finished.
    pub fn completion_order(&self) -> Vec<String> {
        self.completed.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteCache for FakeRemoteCache {
    async fn get_many(
        &self,
        features: &[FeatureName],
        entity_id: &str,
    ) -> Result<RemoteValues, TierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push(features.to_vec());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = self.latency.lock().get(entity_id).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if *self.down.lock() || self.failing.lock().contains(entity_id) {
            return Err(TierError::unavailable("remote", "connection refused"));
        }

        let values = self.values.lock();
        let resolved: RemoteValues = features
            .iter()
            .map(|feature| {
                let value = values
                    .get(&(entity_id.to_string(), feature.clone()))
                    .cloned();
                if value.is_some() {
                    self.counters.record_hit();
                } else {
                    self.counters.record_miss();
                }
                (feature.clone(), value)
            })
            .collect();
        drop(values);

        self.completed.lock().push(entity_id.to_string());
        Ok(resolved)
    }

    async fn health(&self) -> Result<(), TierError> {
        if *self.down.lock() {
            Err(TierError::unavailable("remote", "connection refused"))
        } else {
            Ok(())
        }
    }

    fn stats(&self) -> TierStats {
        self.counters.snapshot()
    }
}

/// Offline store fake keyed by `(entity_id, entity_type, feature)`.
#[derive(Default)]
pub struct FakeOfflineStore {
    values: Mutex<HashMap<(String, String, String), String>>,
    failing: Mutex<HashSet<String>>,
    down: Mutex<bool>,
    lookups: Mutex<Vec<(String, String, String)>>,
}

impl FakeOfflineStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, entity_id: &str, entity_type: &str, feature: &str, raw: &str) {
        self.values.lock().insert(
            (
                entity_id.to_string(),
                entity_type.to_string(),
                feature.to_string(),
            ),
            raw.to_string(),
        );
    }

    /// Fail every lookup of `feature`.
    pub fn fail_feature(&self, feature: &str) {
        self.failing.lock().insert(feature.to_string());
    }

    pub fn set_down(&self, down: bool) {
        *self.down.lock() = down;
    }

    pub fn calls(&self) -> usize {
        self.lookups.lock().len()
    }

    /// Feature names looked up, in call order.
    pub fn looked_up(&self) -> Vec<String> {
        self.lookups
            .lock()
            .iter()
            .map(|(_, _, feature)| feature.clone())
            .collect()
    }
}

#[async_trait]
impl OfflineStore for FakeOfflineStore {
    async fn get_one(
        &self,
        entity_id: &str,
        entity_type: &str,
        feature: &str,
    ) -> Result<Option<String>, TierError> {
        let key = (
            entity_id.to_string(),
            entity_type.to_string(),
            feature.to_string(),
        );
        self.lookups.lock().push(key.clone());

        if self.failing.lock().contains(feature) {
            return Err(TierError::lookup_failed("offline", "relation does not exist"));
        }
        Ok(self.values.lock().get(&key).cloned())
    }

    async fn health(&self) -> Result<(), TierError> {
        if *self.down.lock() {
            Err(TierError::unavailable("offline", "connection refused"))
        } else {
            Ok(())
        }
    }
}

pub struct Harness {
    pub remote: Arc<FakeRemoteCache>,
    pub offline: Arc<FakeOfflineStore>,
    pub resolver: Arc<Resolver>,
}

pub fn harness() -> Harness {
    harness_with_cache(Duration::from_secs(300), 10_000)
}

pub fn harness_with_cache(ttl: Duration, capacity: usize) -> Harness {
    let remote = FakeRemoteCache::new();
    let offline = FakeOfflineStore::new();
    let local = Arc::new(LocalCache::new(ttl, capacity));
    let resolver = Arc::new(Resolver::new(local, remote.clone(), offline.clone()));
    Harness {
        remote,
        offline,
        resolver,
    }
}
