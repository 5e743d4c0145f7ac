use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a feature, e.g. `user_clicks_1h`.
///
/// Names are not unique across entity types.
pub type FeatureName = String;

/// Identifies the subject of a feature lookup, e.g. `("user", "42")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    entity_type: String,
    entity_id: String,
}

impl EntityKey {
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.entity_id)
    }
}

/// A request for an ordered list of features of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRequest {
    pub entity: EntityKey,
    pub features: Vec<FeatureName>,
}

impl FeatureRequest {
    pub fn new<I, S>(entity: EntityKey, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FeatureName>,
    {
        Self {
            entity,
            features: features.into_iter().map(Into::into).collect(),
        }
    }

    /// Requested names in request order, first occurrence only.
    pub fn unique_features(&self) -> Vec<&FeatureName> {
        let mut seen = std::collections::HashSet::with_capacity(self.features.len());
        self.features
            .iter()
            .filter(|name| seen.insert(name.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_type_and_id() {
        assert_eq!(EntityKey::new("user", "42").to_string(), "user/42");
    }

    #[test]
    fn unique_features_keeps_first_occurrence_order() {
        let request = FeatureRequest::new(EntityKey::new("post", "7"), ["b", "a", "b", "c", "a"]);
        let unique: Vec<&str> = request.unique_features().into_iter().map(String::as_str).collect();
        assert_eq!(unique, vec!["b", "a", "c"]);
    }
}
