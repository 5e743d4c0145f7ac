//! Contracts for the tiers behind the in-process cache.
//!
//! Both traits report "no value" as `Ok(None)` and reserve `Err` for failures,
//! so callers can tell a missing feature apart from a broken tier.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::counters::TierStats;
use crate::entity::FeatureName;
use crate::error::TierError;

/// Raw values returned by a batched remote lookup, one entry per requested name.
pub type RemoteValues = HashMap<FeatureName, Option<String>>;

/// Shared, network-accessible key/value cache (L2).
///
/// Implementations pool their own connections and must be safe to call from
/// many tasks at once.
#[async_trait]
pub trait RemoteCache: Send + Sync {
    /// Look up every name in `features` for `entity_id` in one round trip.
    ///
    /// # Errors
    ///
    /// Returns `TierError::Unavailable` when the cache cannot be reached.
    /// Missing keys are `None` in the returned map, never an error.
    async fn get_many(
        &self,
        features: &[FeatureName],
        entity_id: &str,
    ) -> Result<RemoteValues, TierError>;

    /// Liveness probe.
    async fn health(&self) -> Result<(), TierError>;

    /// Per-key hit/miss counters of this tier.
    fn stats(&self) -> TierStats;
}

/// Durable, authoritative store of computed features.
#[async_trait]
pub trait OfflineStore: Send + Sync {
    /// Most recently computed value of `feature` for the entity.
    ///
    /// # Errors
    ///
    /// Returns an error only when the lookup itself failed; `Ok(None)` means
    /// no value was ever computed.
    async fn get_one(
        &self,
        entity_id: &str,
        entity_type: &str,
        feature: &str,
    ) -> Result<Option<String>, TierError>;

    /// Liveness probe.
    async fn health(&self) -> Result<(), TierError>;
}

/// Type alias for a shareable remote cache.
pub type DynRemoteCache = Arc<dyn RemoteCache>;

/// Type alias for a shareable offline store.
pub type DynOfflineStore = Arc<dyn OfflineStore>;
