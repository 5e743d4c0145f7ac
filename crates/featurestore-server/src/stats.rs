//! Read-only view over the cache tiers' counters.

use std::sync::Arc;

use featurestore_core::DynRemoteCache;
use serde::Serialize;

use crate::cache::LocalCache;
use crate::resolver::Resolver;

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub local_cache_size: usize,
    /// Fraction in `[0, 1]`.
    pub local_hit_rate: f64,
    /// Fraction in `[0, 1]`.
    pub remote_hit_rate: f64,
}

/// Aggregates hit rates of the local and remote tiers.
///
/// Either source may be missing; its figures then read as zero.
#[derive(Clone, Default)]
pub struct StatsCollector {
    local: Option<Arc<LocalCache>>,
    remote: Option<DynRemoteCache>,
}

impl StatsCollector {
    pub fn new(local: Option<Arc<LocalCache>>, remote: Option<DynRemoteCache>) -> Self {
        Self { local, remote }
    }

    pub fn from_resolver(resolver: &Resolver) -> Self {
        Self::new(
            Some(Arc::clone(resolver.local_cache())),
            Some(Arc::clone(resolver.remote())),
        )
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let (local_cache_size, local_hit_rate) = self
            .local
            .as_ref()
            .map(|cache| (cache.size(), cache.hit_rate()))
            .unwrap_or_default();
        let remote_hit_rate = self
            .remote
            .as_ref()
            .map(|remote| remote.stats().hit_rate())
            .unwrap_or_default();

        StatsSnapshot {
            local_cache_size,
            local_hit_rate,
            remote_hit_rate,
        }
    }
}
