//! Concurrent, order-preserving resolution of many requests.

use std::sync::Arc;
use std::time::Duration;

use featurestore_core::{FeatureRequest, ResolutionResult, ResolveError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::metrics;
use crate::resolver::Resolver;

/// Fans requests out to a [`Resolver`], one task per request.
///
/// At most `max_concurrency` resolutions run at once across every call made
/// through this executor and its clones. Results come back in request order.
/// The batch is all-or-nothing: the first failure aborts every task still
/// running and fails the whole call.
#[derive(Clone)]
pub struct BatchExecutor {
    resolver: Arc<Resolver>,
    permits: Arc<Semaphore>,
    limit: usize,
    deadline: Option<Duration>,
}

impl BatchExecutor {
    /// A `max_concurrency` of zero is treated as one.
    pub fn new(resolver: Arc<Resolver>, max_concurrency: usize) -> Self {
        let limit = max_concurrency.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            resolver,
            permits: Arc::new(Semaphore::new(limit)),
            limit,
            deadline: None,
        }
    }

    /// Bound every [`BatchExecutor::resolve_many`] call by `deadline`.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn max_concurrency(&self) -> usize {
        self.limit
    }

    /// Permits not currently held by a running resolution.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Resolve `requests`, applying the configured deadline if any.
    pub async fn resolve_many(
        &self,
        requests: Vec<FeatureRequest>,
    ) -> Result<Vec<ResolutionResult>, ResolveError> {
        let deadline = self.deadline.map(|d| Instant::now() + d);
        self.resolve_many_before(requests, deadline).await
    }

    /// Resolve `requests`, failing with [`ResolveError::DeadlineExceeded`] if
    /// `deadline` passes first. Every in-flight resolution is aborted then.
    #[instrument(skip_all, fields(requests = requests.len()))]
    pub async fn resolve_many_before(
        &self,
        requests: Vec<FeatureRequest>,
        deadline: Option<Instant>,
    ) -> Result<Vec<ResolutionResult>, ResolveError> {
        let started = Instant::now();
        let size = requests.len();

        let outcome = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, self.run(requests))
                .await
                .unwrap_or(Err(ResolveError::DeadlineExceeded)),
            None => self.run(requests).await,
        };

        let elapsed = started.elapsed();
        metrics::record_batch(size, elapsed);
        match &outcome {
            Ok(_) => debug!(elapsed_ms = elapsed.as_millis() as u64, "batch resolved"),
            Err(err) => warn!(error = %err, "batch failed"),
        }
        outcome
    }

    async fn run(
        &self,
        requests: Vec<FeatureRequest>,
    ) -> Result<Vec<ResolutionResult>, ResolveError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let mut slots: Vec<Option<ResolutionResult>> = Vec::with_capacity(requests.len());
        slots.resize_with(requests.len(), || None);

        // Dropping `tasks` aborts whatever is still running.
        let mut tasks = JoinSet::new();
        for (index, request) in requests.into_iter().enumerate() {
            let resolver = Arc::clone(&self.resolver);
            let permits = Arc::clone(&self.permits);
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| ResolveError::internal("batch limiter closed"))?;
                resolver.resolve(&request).await.map(|result| (index, result))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.map_err(|e| ResolveError::internal(e.to_string()))??;
            slots[index] = Some(result);
        }

        slots
            .into_iter()
            .map(|slot| slot.ok_or_else(|| ResolveError::internal("resolution result missing")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LocalCache;
    use async_trait::async_trait;
    use featurestore_core::{
        EntityKey, FeatureName, OfflineStore, RemoteCache, RemoteValues, TierError, TierStats,
    };

    /// Every feature resolves to the entity id.
    struct Echo;

    #[async_trait]
    impl RemoteCache for Echo {
        async fn get_many(
            &self,
            features: &[FeatureName],
            entity_id: &str,
        ) -> Result<RemoteValues, TierError> {
            Ok(features
                .iter()
                .map(|f| (f.clone(), Some(format!("\"{entity_id}\""))))
                .collect())
        }

        async fn health(&self) -> Result<(), TierError> {
            Ok(())
        }

        fn stats(&self) -> TierStats {
            TierStats::default()
        }
    }

    #[async_trait]
    impl OfflineStore for Echo {
        async fn get_one(&self, _: &str, _: &str, _: &str) -> Result<Option<String>, TierError> {
            Ok(None)
        }

        async fn health(&self) -> Result<(), TierError> {
            Ok(())
        }
    }

    fn executor(limit: usize) -> BatchExecutor {
        let local = Arc::new(LocalCache::new(Duration::from_secs(60), 64));
        let resolver = Arc::new(Resolver::new(local, Arc::new(Echo), Arc::new(Echo)));
        BatchExecutor::new(resolver, limit)
    }

    #[tokio::test]
    async fn empty_batch_resolves_to_nothing() {
        let results = executor(4).resolve_many(Vec::new()).await.expect("empty");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn results_follow_request_order() {
        let requests: Vec<_> = (0..20)
            .map(|i| FeatureRequest::new(EntityKey::new("user", i.to_string()), ["name"]))
            .collect();
        let results = executor(3).resolve_many(requests).await.expect("batch");

        assert_eq!(results.len(), 20);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.entity.entity_id(), i.to_string());
            assert_eq!(
                result.features.get("name").and_then(|v| v.as_str()),
                Some(i.to_string().as_str())
            );
        }
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        assert_eq!(executor(0).max_concurrency(), 1);
    }

    #[tokio::test]
    async fn clones_share_one_limiter() {
        let batch = executor(4);
        let clone = batch.clone();
        let held = clone
            .permits
            .clone()
            .acquire_many_owned(3)
            .await
            .expect("limiter open");
        assert_eq!(batch.available_permits(), 1);
        drop(held);
        assert_eq!(batch.available_permits(), 4);
    }
}
