//! # featurestore-core
//!
//! Core types for the feature store: entity keys, feature values, the merged
//! feature set returned to callers, and the traits that the remote cache and
//! offline store tiers implement.
//!
//! This crate holds no tier implementations. The Redis tier lives in
//! `featurestore-server`, the PostgreSQL offline tier in
//! `featurestore-db-postgres`.
//!
//! ## Tiers
//!
//! ```text
//! resolve → L1 (in-process) → L2 (RemoteCache) → offline (OfflineStore)
//! ```

pub mod counters;
pub mod entity;
pub mod error;
pub mod feature;
pub mod resolution;
pub mod tiers;
pub mod value;

pub use counters::{TierCounters, TierStats};
pub use entity::{EntityKey, FeatureName, FeatureRequest};
pub use error::{ResolveError, TierError};
pub use feature::{CacheKey, FeatureSet};
pub use resolution::{ResolutionResult, Tier};
pub use tiers::{DynOfflineStore, DynRemoteCache, OfflineStore, RemoteCache, RemoteValues};
pub use value::FeatureValue;
