use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use featurestore_core::{DynOfflineStore, DynRemoteCache};
use featurestore_db_postgres::PostgresOfflineStore;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::batch::BatchExecutor;
use crate::cache::{LocalCache, RedisRemoteCache};
use crate::config::AppConfig;
use crate::consistency::ConsistencyChecker;
use crate::handlers;
use crate::resolver::Resolver;
use crate::stats::StatsCollector;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    pub batch: BatchExecutor,
    pub stats: StatsCollector,
    pub consistency: ConsistencyChecker,
    /// Bound on a single-entity request
    pub request_deadline: Option<Duration>,
}

impl AppState {
    pub fn new(resolver: Arc<Resolver>, cfg: &AppConfig) -> Self {
        let batch = BatchExecutor::new(Arc::clone(&resolver), cfg.batch.max_concurrency)
            .with_deadline(cfg.batch.deadline());
        let stats = StatsCollector::from_resolver(&resolver);
        let consistency = ConsistencyChecker::from_resolver(&resolver);
        Self {
            resolver,
            batch,
            stats,
            consistency,
            request_deadline: cfg.server.request_deadline(),
        }
    }
}

pub fn build_router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/api/v1/features", post(handlers::get_features))
        .route("/api/v1/features/batch", post(handlers::get_features_batch))
        .route("/api/v1/consistency", post(handlers::check_consistency))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = tracing::field::Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub struct FeatureServer {
    addr: SocketAddr,
    app: Router,
    resolver: Arc<Resolver>,
    sweeper: JoinHandle<()>,
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Connect to Redis and PostgreSQL and assemble the server.
    ///
    /// Either tier being unreachable fails startup.
    pub async fn build(self) -> anyhow::Result<FeatureServer> {
        let remote = RedisRemoteCache::connect(&self.config.redis).await?;

        let pg = self.config.postgres.to_store_config();
        tracing::info!(
            url = %featurestore_db_postgres::redact_url(&pg.url),
            "Connecting to PostgreSQL"
        );
        let offline = PostgresOfflineStore::connect(&pg).await?;
        tracing::info!("Connected to PostgreSQL");

        Ok(self.build_with_tiers(Arc::new(remote), Arc::new(offline)))
    }

    /// Assemble the server over already connected tiers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build_with_tiers(self, remote: DynRemoteCache, offline: DynOfflineStore) -> FeatureServer {
        let cfg = self.config;
        let local = Arc::new(LocalCache::new(cfg.cache.ttl(), cfg.cache.max_entries));
        let resolver = Arc::new(Resolver::new(local, remote, offline));
        let sweeper = resolver.start_sweeper(cfg.cache.sweep_interval());

        tracing::info!(
            ttl_secs = cfg.cache.ttl_secs,
            max_entries = cfg.cache.max_entries,
            max_concurrency = cfg.batch.max_concurrency,
            "Feature resolver ready"
        );

        let state = AppState::new(Arc::clone(&resolver), &cfg);
        FeatureServer {
            addr: cfg.addr(),
            app: build_router(state, cfg.server.body_limit_bytes),
            resolver,
            sweeper,
        }
    }
}

impl FeatureServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        self.resolver.shutdown();
        if let Err(err) = self.sweeper.await {
            tracing::warn!(error = %err, "local cache sweeper did not stop cleanly");
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
