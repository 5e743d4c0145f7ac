//! Redis-backed remote cache tier (L2).
//!
//! ## Key Format
//!
//! `feature:{feature_name}:{entity_id}`, e.g. `feature:user_clicks_1h:42`
//!
//! Values are stored as text; decoding happens in the resolver.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Pool, PoolConfig, Runtime};
use featurestore_core::{FeatureName, RemoteCache, RemoteValues, TierCounters, TierError, TierStats};

use crate::config::RedisConfig;

/// Tier name reported in [`TierError`]s raised by this module.
pub const REMOTE_TIER: &str = "remote";

/// Redis key of one feature of one entity.
#[inline]
pub fn feature_key(feature: &str, entity_id: &str) -> String {
    format!("feature:{feature}:{entity_id}")
}

/// Remote cache tier over a pooled Redis connection.
pub struct RedisRemoteCache {
    pool: Pool,
    /// Bound on a whole call, pool checkout included.
    timeout: Duration,
    counters: TierCounters,
}

impl RedisRemoteCache {
    pub fn new(pool: Pool, timeout: Duration) -> Self {
        Self {
            pool,
            timeout,
            counters: TierCounters::new(),
        }
    }

    /// Build the connection pool from `config` and verify it with a `PING`.
    pub async fn connect(config: &RedisConfig) -> Result<Self, TierError> {
        tracing::info!(url = %config.url, pool_size = config.pool_size, "Connecting to Redis");

        let connect_timeout = Duration::from_millis(config.connect_timeout_ms);
        let mut pool_config = PoolConfig::new(config.pool_size);
        pool_config.timeouts.wait = Some(connect_timeout);
        pool_config.timeouts.create = Some(connect_timeout);
        pool_config.timeouts.recycle = Some(connect_timeout);

        let mut redis_config = deadpool_redis::Config::from_url(&config.url);
        redis_config.pool = Some(pool_config);

        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| TierError::unavailable(REMOTE_TIER, e.to_string()))?;

        let cache = Self::new(pool, Duration::from_millis(config.timeout_ms));
        cache.health().await?;
        tracing::info!("Connected to Redis");
        Ok(cache)
    }

    async fn fetch(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, TierError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| TierError::unavailable(REMOTE_TIER, e.to_string()))?;

        let values: Vec<Option<Vec<u8>>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| TierError::unavailable(REMOTE_TIER, e.to_string()))?;

        if values.len() != keys.len() {
            return Err(TierError::lookup_failed(
                REMOTE_TIER,
                format!("MGET returned {} values for {} keys", values.len(), keys.len()),
            ));
        }
        Ok(values)
    }

    fn timed_out(&self) -> TierError {
        TierError::unavailable(
            REMOTE_TIER,
            format!("no reply within {}ms", self.timeout.as_millis()),
        )
    }
}

#[async_trait]
impl RemoteCache for RedisRemoteCache {
    async fn get_many(
        &self,
        features: &[FeatureName],
        entity_id: &str,
    ) -> Result<RemoteValues, TierError> {
        if features.is_empty() {
            return Ok(RemoteValues::new());
        }

        let keys: Vec<String> = features
            .iter()
            .map(|feature| feature_key(feature, entity_id))
            .collect();

        let values = tokio::time::timeout(self.timeout, self.fetch(&keys))
            .await
            .map_err(|_| self.timed_out())??;

        let mut resolved = RemoteValues::with_capacity(features.len());
        for (feature, value) in features.iter().zip(values) {
            let value = value.map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
            if value.is_some() {
                self.counters.record_hit();
            } else {
                self.counters.record_miss();
            }
            resolved.insert(feature.clone(), value);
        }

        tracing::debug!(
            entity_id,
            requested = features.len(),
            found = resolved.values().filter(|v| v.is_some()).count(),
            "remote cache lookup"
        );
        Ok(resolved)
    }

    async fn health(&self) -> Result<(), TierError> {
        let ping = async {
            let mut conn = self
                .pool
                .get()
                .await
                .map_err(|e| TierError::unavailable(REMOTE_TIER, e.to_string()))?;
            let _: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(|e| TierError::unavailable(REMOTE_TIER, e.to_string()))?;
            Ok::<(), TierError>(())
        };

        tokio::time::timeout(self.timeout, ping)
            .await
            .map_err(|_| self.timed_out())?
    }

    fn stats(&self) -> TierStats {
        self.counters.snapshot()
    }
}
