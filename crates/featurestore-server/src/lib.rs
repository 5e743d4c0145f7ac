//! Tiered feature resolution engine and its HTTP server.
//!
//! Feature values are served from three tiers, fastest first: an in-process
//! cache ([`cache::LocalCache`]), a shared Redis cache
//! ([`cache::RedisRemoteCache`]) and the PostgreSQL offline store. The
//! [`Resolver`] walks the tiers for one entity; the [`BatchExecutor`] fans
//! many requests out over it.

pub mod batch;
pub mod cache;
pub mod config;
pub mod consistency;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod observability;
pub mod resolver;
pub mod server;
pub mod stats;

pub use batch::BatchExecutor;
pub use config::AppConfig;
pub use consistency::{ConsistencyChecker, ConsistencyReport, FeatureCheck};
pub use error::ApiError;
pub use resolver::Resolver;
pub use server::{AppState, FeatureServer, ServerBuilder, build_router};
pub use stats::{StatsCollector, StatsSnapshot};
