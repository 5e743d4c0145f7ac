//! Request and response bodies of the HTTP API.

use featurestore_core::{
    EntityKey, FeatureName, FeatureRequest, FeatureSet, ResolutionResult, Tier,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ApiError;
use crate::stats::StatsSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRequestBody {
    #[serde(default)]
    pub entity_id: String,
    /// e.g. "user" or "post"
    #[serde(default)]
    pub entity_type: String,
    #[serde(default)]
    pub features: Vec<String>,
}

impl FeatureRequestBody {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.entity_id.is_empty() {
            return Err(ApiError::bad_request("entity_id is required"));
        }
        if self.entity_type.is_empty() {
            return Err(ApiError::bad_request("entity_type is required"));
        }
        if self.features.is_empty() {
            return Err(ApiError::bad_request("features must not be empty"));
        }
        if self.features.iter().any(String::is_empty) {
            return Err(ApiError::bad_request("feature names must not be empty"));
        }
        Ok(())
    }

    pub fn into_request(self) -> Result<FeatureRequest, ApiError> {
        self.validate()?;
        Ok(FeatureRequest::new(
            EntityKey::new(self.entity_type, self.entity_id),
            self.features,
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureResponse {
    pub entity_id: String,
    pub entity_type: String,
    pub features: FeatureSet,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub cache_hit: bool,
    /// "L1", "L2" or "miss"
    pub cache_level: Tier,
}

impl From<ResolutionResult> for FeatureResponse {
    fn from(result: ResolutionResult) -> Self {
        Self {
            cache_hit: result.cache_hit(),
            entity_id: result.entity.entity_id().to_string(),
            entity_type: result.entity.entity_type().to_string(),
            features: result.features,
            timestamp: result.timestamp,
            cache_level: result.tier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFeatureRequest {
    #[serde(default)]
    pub requests: Vec<FeatureRequestBody>,
}

impl BatchFeatureRequest {
    /// Validate every element; the first invalid one rejects the batch.
    pub fn into_requests(self) -> Result<Vec<FeatureRequest>, ApiError> {
        self.requests
            .into_iter()
            .enumerate()
            .map(|(index, body)| {
                body.into_request().map_err(|err| {
                    ApiError::bad_request(format!("requests[{index}]: {err}"))
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFeatureResponse {
    pub responses: Vec<FeatureResponse>,
    pub latency_ms: u64,
}

/// Body of `POST /api/v1/consistency`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyRequest {
    #[serde(default)]
    pub entity_type: String,
    #[serde(default)]
    pub entity_ids: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl ConsistencyRequest {
    pub fn into_parts(self) -> Result<(Vec<EntityKey>, Vec<FeatureName>), ApiError> {
        if self.entity_type.is_empty() {
            return Err(ApiError::bad_request("entity_type is required"));
        }
        if self.entity_ids.is_empty() {
            return Err(ApiError::bad_request("entity_ids must not be empty"));
        }
        if self.entity_ids.iter().any(String::is_empty) {
            return Err(ApiError::bad_request("entity ids must not be empty"));
        }
        if self.features.is_empty() {
            return Err(ApiError::bad_request("features must not be empty"));
        }
        if self.features.iter().any(String::is_empty) {
            return Err(ApiError::bad_request("feature names must not be empty"));
        }

        let entity_type = self.entity_type;
        let entities = self
            .entity_ids
            .into_iter()
            .map(|id| EntityKey::new(entity_type.clone(), id))
            .collect();
        Ok((entities, self.features))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub l1_cache_size: usize,
    pub l1_hit_rate: f64,
    pub l2_hit_rate: f64,
}

impl From<StatsSnapshot> for StatsResponse {
    fn from(snapshot: StatsSnapshot) -> Self {
        Self {
            l1_cache_size: snapshot.local_cache_size,
            l1_hit_rate: snapshot.local_hit_rate,
            l2_hit_rate: snapshot.remote_hit_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,
    pub redis: bool,
    pub postgres: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl HealthResponse {
    pub fn new(redis: bool, postgres: bool) -> Self {
        let status = if redis && postgres { "healthy" } else { "degraded" };
        Self {
            status: status.into(),
            redis,
            postgres,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.redis && self.postgres
    }
}
