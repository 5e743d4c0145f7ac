use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt;

use crate::entity::{EntityKey, FeatureName};
use crate::value::FeatureValue;

/// Feature values for one entity, keyed by feature name.
///
/// Every requested name has a slot; `None` marks a feature that no tier could
/// answer. Serializes as a JSON object with `null` for absent slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(HashMap<FeatureName, Option<FeatureValue>>);

impl FeatureSet {
    /// Create a set with one absent slot per requested name.
    pub fn for_request(names: &[FeatureName]) -> Self {
        Self(names.iter().map(|name| (name.clone(), None)).collect())
    }

    /// Fill (or overwrite) the slot for `name`.
    pub fn resolve(&mut self, name: impl Into<FeatureName>, value: FeatureValue) {
        self.0.insert(name.into(), Some(value));
    }

    /// Resolved value of `name`, if any.
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.0.get(name).and_then(Option::as_ref)
    }

    /// Whether `name` has a slot, resolved or not.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether every slot holds a value.
    pub fn is_complete(&self) -> bool {
        self.0.values().all(Option::is_some)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, FeatureName, Option<FeatureValue>> {
        self.0.iter()
    }
}

impl IntoIterator for FeatureSet {
    type Item = (FeatureName, Option<FeatureValue>);
    type IntoIter = hash_map::IntoIter<FeatureName, Option<FeatureValue>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Address of a [`FeatureSet`] in the local cache.
///
/// Derived from the entity and the feature names in request order, so the
/// same entity asked for `[a, b]` and `[b, a]` lands on two different entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(entity: &EntityKey, features: &[FeatureName]) -> Self {
        Self(format!(
            "{}:{}:{:?}",
            entity.entity_type(),
            entity.entity_id(),
            features
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CacheKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for CacheKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}
