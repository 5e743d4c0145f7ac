use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

use crate::entity::EntityKey;
use crate::feature::FeatureSet;

/// Which tier answered a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Served from the in-process cache.
    #[serde(rename = "L1")]
    Local,
    /// Every feature came from the remote cache.
    #[serde(rename = "L2")]
    Remote,
    /// At least one feature missed the remote cache and the offline store was consulted.
    #[serde(rename = "miss")]
    PartialOffline,
}

impl Tier {
    /// Wire label: `L1`, `L2` or `miss`.
    pub fn label(self) -> &'static str {
        match self {
            Tier::Local => "L1",
            Tier::Remote => "L2",
            Tier::PartialOffline => "miss",
        }
    }

    pub fn is_cache_hit(self) -> bool {
        !matches!(self, Tier::PartialOffline)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of resolving one entity's features. Not retained after return.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    pub entity: EntityKey,
    pub features: FeatureSet,
    pub tier: Tier,
    pub timestamp: OffsetDateTime,
}

impl ResolutionResult {
    pub fn new(entity: EntityKey, features: FeatureSet, tier: Tier) -> Self {
        Self {
            entity,
            features,
            tier,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn cache_hit(&self) -> bool {
        self.tier.is_cache_hit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_wire_names() {
        assert_eq!(Tier::Local.label(), "L1");
        assert_eq!(Tier::Remote.label(), "L2");
        assert_eq!(Tier::PartialOffline.to_string(), "miss");
        assert_eq!(serde_json::to_string(&Tier::PartialOffline).unwrap(), "\"miss\"");
    }

    #[test]
    fn only_offline_fallback_is_a_miss() {
        assert!(Tier::Local.is_cache_hit());
        assert!(Tier::Remote.is_cache_hit());
        assert!(!Tier::PartialOffline.is_cache_hit());
    }
}
