//! PostgreSQL implementation of [`OfflineStore`].

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use featurestore_core::{OfflineStore, TierError};

use crate::config::PostgresConfig;
use crate::error::{PostgresError, Result};
use crate::pool::{connect_pool, ping};
use crate::schema::ensure_schema;

const SELECT_LATEST: &str = r#"
SELECT feature_value
FROM offline_features
WHERE entity_id = $1
  AND entity_type = $2
  AND feature_name = $3
ORDER BY computed_at DESC
LIMIT 1
"#;

const SELECT_AS_OF: &str = r#"
SELECT feature_value
FROM offline_features
WHERE entity_id = $1
  AND entity_type = $2
  AND feature_name = $3
  AND computed_at <= $4
ORDER BY computed_at DESC
LIMIT 1
"#;

const INSERT_VALUE: &str = r#"
INSERT INTO offline_features (entity_id, entity_type, feature_name, feature_value, computed_at)
VALUES ($1, $2, $3, $4, $5)
"#;

/// Offline feature store backed by the `offline_features` table.
///
/// Rows are append-only; a lookup returns the most recently computed value.
#[derive(Debug, Clone)]
pub struct PostgresOfflineStore {
    pool: PgPool,
}

impl PostgresOfflineStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using `config`, creating the schema when `create_schema` is set.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = connect_pool(config).await?;
        ping(&pool).await?;
        if config.create_schema {
            ensure_schema(&pool).await?;
        }
        Ok(Self::new(pool))
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Most recent value of the feature, if one was computed.
    #[instrument(skip(self))]
    pub async fn latest(
        &self,
        entity_id: &str,
        entity_type: &str,
        feature: &str,
    ) -> Result<Option<String>> {
        let row: Option<(Option<String>,)> = query_as(SELECT_LATEST)
            .bind(entity_id)
            .bind(entity_type)
            .bind(feature)
            .fetch_optional(&self.pool)
            .await?;

        Ok(present(row))
    }

    /// Most recent value computed at or before `as_of`.
    #[instrument(skip(self))]
    pub async fn as_of(
        &self,
        entity_id: &str,
        entity_type: &str,
        feature: &str,
        as_of: OffsetDateTime,
    ) -> Result<Option<String>> {
        let row: Option<(Option<String>,)> = query_as(SELECT_AS_OF)
            .bind(entity_id)
            .bind(entity_type)
            .bind(feature)
            .bind(as_of)
            .fetch_optional(&self.pool)
            .await?;

        Ok(present(row))
    }

    /// Appends a newly computed value.
    #[instrument(skip(self, value))]
    pub async fn record(
        &self,
        entity_id: &str,
        entity_type: &str,
        feature: &str,
        value: &str,
        computed_at: OffsetDateTime,
    ) -> Result<()> {
        query(INSERT_VALUE)
            .bind(entity_id)
            .bind(entity_type)
            .bind(feature)
            .bind(value)
            .bind(computed_at)
            .execute(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        debug!("Offline feature recorded");
        Ok(())
    }
}

/// No row, SQL NULL and an empty string all mean "nothing computed".
fn present(row: Option<(Option<String>,)>) -> Option<String> {
    row.and_then(|(value,)| value).filter(|value| !value.is_empty())
}

#[async_trait]
impl OfflineStore for PostgresOfflineStore {
    async fn get_one(
        &self,
        entity_id: &str,
        entity_type: &str,
        feature: &str,
    ) -> std::result::Result<Option<String>, TierError> {
        self.latest(entity_id, entity_type, feature)
            .await
            .map_err(TierError::from)
    }

    async fn health(&self) -> std::result::Result<(), TierError> {
        ping(&self.pool).await.map_err(TierError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_row_is_absent() {
        assert_eq!(present(None), None);
    }

    #[test]
    fn null_and_empty_values_are_absent() {
        assert_eq!(present(Some((None,))), None);
        assert_eq!(present(Some((Some(String::new()),))), None);
    }

    #[test]
    fn stored_text_is_returned_verbatim() {
        assert_eq!(
            present(Some((Some("\"US\"".to_string()),))),
            Some("\"US\"".to_string())
        );
    }
}
