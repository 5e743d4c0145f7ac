//! Online/offline consistency checks.
//!
//! Compares what the remote cache serves for a feature with the latest value
//! in the offline store. Values are compared after decoding, so `31` and
//! ` 31 ` agree while `31` and `"31"` do not. A feature absent from both
//! tiers counts as consistent.

use std::collections::HashSet;

use featurestore_core::{
    DynOfflineStore, DynRemoteCache, EntityKey, FeatureName, FeatureValue, TierError,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::metrics;
use crate::resolver::Resolver;

/// Outcome of comparing one feature of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCheck {
    pub entity_id: String,
    pub entity_type: String,
    pub feature_name: FeatureName,
    pub online: Option<FeatureValue>,
    pub offline: Option<FeatureValue>,
    pub consistent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub total_checks: usize,
    pub consistent: usize,
    pub inconsistent: usize,
    /// Fraction of consistent checks; 0.0 when nothing was checked.
    pub consistency_rate: f64,
    pub results: Vec<FeatureCheck>,
}

impl ConsistencyReport {
    fn from_checks(results: Vec<FeatureCheck>) -> Self {
        let total_checks = results.len();
        let consistent = results.iter().filter(|c| c.consistent).count();
        let consistency_rate = if total_checks == 0 {
            0.0
        } else {
            consistent as f64 / total_checks as f64
        };
        Self {
            total_checks,
            consistent,
            inconsistent: total_checks - consistent,
            consistency_rate,
            results,
        }
    }
}

/// Reads both backing tiers directly, bypassing the local cache.
///
/// Remote lookups made here count toward the remote cache hit rate.
#[derive(Clone)]
pub struct ConsistencyChecker {
    remote: DynRemoteCache,
    offline: DynOfflineStore,
}

impl ConsistencyChecker {
    pub fn new(remote: DynRemoteCache, offline: DynOfflineStore) -> Self {
        Self { remote, offline }
    }

    /// Check the tiers a resolver reads from.
    pub fn from_resolver(resolver: &Resolver) -> Self {
        Self::new(resolver.remote().clone(), resolver.offline().clone())
    }

    /// Compare every feature of `entity`, one batched remote lookup plus one
    /// offline lookup per distinct name.
    ///
    /// Unlike resolution, an offline failure fails the check: a value that
    /// could not be read cannot be compared.
    #[instrument(
        skip_all,
        fields(entity_type = %entity.entity_type(), entity_id = %entity.entity_id())
    )]
    pub async fn check_entity(
        &self,
        entity: &EntityKey,
        features: &[FeatureName],
    ) -> Result<Vec<FeatureCheck>, TierError> {
        let mut seen = HashSet::new();
        let names: Vec<FeatureName> = features
            .iter()
            .filter(|name| seen.insert(*name))
            .cloned()
            .collect();

        let mut online = self.remote.get_many(&names, entity.entity_id()).await?;

        let mut checks = Vec::with_capacity(names.len());
        for name in names {
            let online = online
                .remove(&name)
                .flatten()
                .map(|raw| FeatureValue::parse(&raw));
            let offline = self
                .offline
                .get_one(entity.entity_id(), entity.entity_type(), &name)
                .await?
                .map(|raw| FeatureValue::parse(&raw));

            let consistent = online == offline;
            metrics::record_consistency_check(consistent);
            if !consistent {
                warn!(feature = %name, ?online, ?offline, "online and offline values differ");
            }

            checks.push(FeatureCheck {
                entity_id: entity.entity_id().to_string(),
                entity_type: entity.entity_type().to_string(),
                feature_name: name,
                online,
                offline,
                consistent,
            });
        }
        Ok(checks)
    }

    /// Check `features` for each entity in turn and summarize.
    pub async fn check_many(
        &self,
        entities: &[EntityKey],
        features: &[FeatureName],
    ) -> Result<ConsistencyReport, TierError> {
        let mut results = Vec::with_capacity(entities.len() * features.len());
        for entity in entities {
            results.extend(self.check_entity(entity, features).await?);
        }

        let report = ConsistencyReport::from_checks(results);
        info!(
            total = report.total_checks,
            inconsistent = report.inconsistent,
            rate = report.consistency_rate,
            "consistency check complete"
        );
        Ok(report)
    }
}
