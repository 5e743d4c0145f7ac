//! Tiered feature resolution.
//!
//! A request is answered by the first tier that can:
//!
//! 1. the local cache, keyed by the whole request shape;
//! 2. one batched remote cache lookup for every requested name;
//! 3. one offline store lookup per name still missing.
//!
//! The merged result is always written back to the local cache. A remote
//! cache failure fails the request; offline failures only leave the feature
//! absent.

use std::sync::Arc;
use std::time::Duration;

use featurestore_core::{
    CacheKey, DynOfflineStore, DynRemoteCache, FeatureName, FeatureRequest, FeatureSet,
    FeatureValue, ResolutionResult, ResolveError, Tier,
};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::cache::LocalCache;
use crate::metrics;

/// Resolves feature requests across the local, remote and offline tiers.
///
/// Dropping the resolver (or calling [`Resolver::shutdown`]) stops the local
/// cache sweeper started through it.
pub struct Resolver {
    local: Arc<LocalCache>,
    remote: DynRemoteCache,
    offline: DynOfflineStore,
    shutdown: CancellationToken,
}

impl Resolver {
    pub fn new(local: Arc<LocalCache>, remote: DynRemoteCache, offline: DynOfflineStore) -> Self {
        Self {
            local,
            remote,
            offline,
            shutdown: CancellationToken::new(),
        }
    }

    /// Start the local cache expiry sweep, bound to this resolver's lifetime.
    pub fn start_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        self.local
            .spawn_sweeper(interval, self.shutdown.child_token())
    }

    pub fn local_cache(&self) -> &Arc<LocalCache> {
        &self.local
    }

    pub fn remote(&self) -> &DynRemoteCache {
        &self.remote
    }

    pub fn offline(&self) -> &DynOfflineStore {
        &self.offline
    }

    /// Resolve every feature of `request`.
    ///
    /// Fails only when the remote cache cannot serve the batched lookup.
    #[instrument(
        skip_all,
        fields(
            entity_type = %request.entity.entity_type(),
            entity_id = %request.entity.entity_id(),
            features = request.features.len(),
        )
    )]
    pub async fn resolve(&self, request: &FeatureRequest) -> Result<ResolutionResult, ResolveError> {
        let entity = &request.entity;
        let key = CacheKey::derive(entity, &request.features);

        if let Some(cached) = self.local.get(&key) {
            metrics::record_cache_hit(Tier::Local.label());
            metrics::record_resolution(Tier::Local);
            debug!(tier = %Tier::Local, "served from local cache");
            return Ok(ResolutionResult::new(
                entity.clone(),
                FeatureSet::clone(&cached),
                Tier::Local,
            ));
        }
        metrics::record_cache_miss(Tier::Local.label());

        let names: Vec<FeatureName> = request.unique_features().into_iter().cloned().collect();
        let mut features = FeatureSet::for_request(&request.features);

        let remote = self
            .remote
            .get_many(&names, entity.entity_id())
            .await
            .map_err(|err| {
                warn!(error = %err, "remote cache lookup failed");
                ResolveError::TierUnavailable(err)
            })?;

        for name in &names {
            match remote.get(name) {
                Some(Some(raw)) => {
                    features.resolve(name.clone(), FeatureValue::parse(raw));
                    metrics::record_cache_hit(Tier::Remote.label());
                }
                _ => metrics::record_cache_miss(Tier::Remote.label()),
            }
        }

        let tier = if features.is_complete() {
            Tier::Remote
        } else {
            self.fill_from_offline(request, &names, &mut features).await;
            Tier::PartialOffline
        };

        self.local.set(key, features.clone());
        metrics::set_local_cache_entries(self.local.size());
        metrics::record_resolution(tier);
        debug!(%tier, resolved = features.iter().filter(|(_, v)| v.is_some()).count(), "resolved");

        Ok(ResolutionResult::new(entity.clone(), features, tier))
    }

    /// [`Resolver::resolve`] bounded by `deadline`.
    ///
    /// In-flight tier lookups are dropped when the deadline passes.
    pub async fn resolve_before(
        &self,
        request: &FeatureRequest,
        deadline: Instant,
    ) -> Result<ResolutionResult, ResolveError> {
        tokio::time::timeout_at(deadline, self.resolve(request))
            .await
            .map_err(|_| ResolveError::DeadlineExceeded)?
    }

    /// Stop background work started through this resolver.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::info!("resolver shutting down");
            self.shutdown.cancel();
        }
    }

    /// Look up each missing name in turn. Failures leave the feature absent.
    async fn fill_from_offline(
        &self,
        request: &FeatureRequest,
        names: &[FeatureName],
        features: &mut FeatureSet,
    ) {
        let entity = &request.entity;
        for name in names {
            if features.is_resolved(name) {
                continue;
            }
            match self
                .offline
                .get_one(entity.entity_id(), entity.entity_type(), name)
                .await
            {
                Ok(Some(raw)) => features.resolve(name.clone(), FeatureValue::parse(&raw)),
                Ok(None) => debug!(feature = %name, "feature not computed"),
                Err(err) => {
                    warn!(feature = %name, error = %err, "offline lookup failed");
                    metrics::record_offline_failure();
                }
            }
        }
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
