//! Connection pool for the offline store.

use std::time::Duration;

use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgPool, Postgres};
use tracing::{debug, info, instrument};

use crate::config::PostgresConfig;
use crate::error::{PostgresError, Result};

/// Connections are recycled after this long regardless of use.
const MAX_LIFETIME: Duration = Duration::from_secs(1800);

/// Open a pool sized by `config.max_connections`.
#[instrument(skip(config), fields(url = %redact_url(&config.url)))]
pub async fn connect_pool(config: &PostgresConfig) -> Result<PgPool> {
    if config.max_connections == 0 {
        return Err(PostgresError::config("max_connections must be > 0"));
    }

    let pool = PoolOptions::<Postgres>::new()
        .max_connections(config.max_connections)
        .min_connections(1)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(MAX_LIFETIME)
        .test_before_acquire(false)
        .connect(&config.url)
        .await?;

    info!(
        max_connections = config.max_connections,
        "offline store pool ready"
    );
    Ok(pool)
}

/// Round-trip `SELECT 1` through the pool.
pub async fn ping(pool: &PgPool) -> Result<()> {
    sqlx_core::query::query("SELECT 1").execute(pool).await?;
    debug!("offline store answered ping");
    Ok(())
}

/// `url` with any password replaced by `****`, for logging.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((userinfo, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
        None => url.to_string(),
    }
}
