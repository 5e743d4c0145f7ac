//! Schema bootstrap for the offline feature table.

use sqlx_postgres::PgPool;
use tracing::{info, instrument};

use crate::error::Result;

/// Name of the table holding computed features.
pub const OFFLINE_FEATURES_TABLE: &str = "offline_features";

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS offline_features (
    id            BIGSERIAL PRIMARY KEY,
    entity_id     TEXT        NOT NULL,
    entity_type   TEXT        NOT NULL,
    feature_name  TEXT        NOT NULL,
    feature_value TEXT,
    computed_at   TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_LOOKUP_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS offline_features_lookup_idx
    ON offline_features (entity_id, entity_type, feature_name, computed_at DESC)
"#;

/// Creates the offline feature table and its lookup index if missing.
///
/// Safe to run on every startup.
#[instrument(skip(pool))]
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx_core::query::query(CREATE_TABLE).execute(pool).await?;
    sqlx_core::query::query(CREATE_LOOKUP_INDEX)
        .execute(pool)
        .await?;

    info!(table = OFFLINE_FEATURES_TABLE, "Offline feature schema ready");
    Ok(())
}
