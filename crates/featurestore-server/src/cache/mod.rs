//! Cache tiers in front of the offline store.
//!
//! ## Cache Hierarchy
//!
//! ```text
//! request → L1 (in-process) → L2 (Redis) → offline store (PostgreSQL)
//!               ↓                 ↓               ↓
//!          <1µs latency     ~1ms latency    ~10ms per feature
//! ```
//!
//! L1 caches whole resolved feature sets per request shape; L2 holds one key
//! per (feature, entity) pair and is shared across instances.

pub mod local;
pub mod remote;

pub use local::{LocalCache, LocalCacheStats};
pub use remote::{REMOTE_TIER, RedisRemoteCache, feature_key};
