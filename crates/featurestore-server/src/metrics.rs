//! Prometheus metrics for the feature store.
//!
//! This module provides:
//! - Per-tier cache hit/miss counters
//! - Resolution counts by serving tier
//! - Offline lookup failures
//! - Batch request counts and latency
//! - Online/offline consistency check outcomes
//!
//! Recording without an installed recorder is a no-op, so tests never need
//! to call [`init_metrics`].

use featurestore_core::Tier;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names as constants for consistency.
pub mod names {
    // Cache metrics
    pub const CACHE_HITS_TOTAL: &str = "feature_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "feature_cache_misses_total";
    pub const LOCAL_CACHE_ENTRIES: &str = "feature_local_cache_entries";

    // Resolution metrics
    pub const RESOLUTIONS_TOTAL: &str = "feature_resolutions_total";
    pub const OFFLINE_LOOKUP_FAILURES_TOTAL: &str = "feature_offline_lookup_failures_total";

    // Batch metrics
    pub const BATCH_REQUESTS_TOTAL: &str = "feature_batch_requests_total";
    pub const BATCH_DURATION_SECONDS: &str = "feature_batch_duration_seconds";

    // Consistency metrics
    pub const CONSISTENCY_CHECKS_TOTAL: &str = "feature_consistency_checks_total";
}

/// Initialize the Prometheus metrics exporter.
///
/// This should be called once at server startup.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    // Pull-based: /metrics renders the handle itself
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }

            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render all metrics in Prometheus text format.
///
/// Returns `None` if metrics were not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

// =============================================================================
// Cache Metrics
// =============================================================================

/// Record a cache hit. `tier` is a tier label ("L1", "L2").
pub fn record_cache_hit(tier: &'static str) {
    counter!(names::CACHE_HITS_TOTAL, "tier" => tier).increment(1);
}

/// Record a cache miss.
pub fn record_cache_miss(tier: &'static str) {
    counter!(names::CACHE_MISSES_TOTAL, "tier" => tier).increment(1);
}

pub fn set_local_cache_entries(count: usize) {
    gauge!(names::LOCAL_CACHE_ENTRIES).set(count as f64);
}

// =============================================================================
// Resolution Metrics
// =============================================================================

/// Record a finished resolution under the tier that served it.
pub fn record_resolution(tier: Tier) {
    counter!(names::RESOLUTIONS_TOTAL, "tier" => tier.label()).increment(1);
}

pub fn record_offline_failure() {
    counter!(names::OFFLINE_LOOKUP_FAILURES_TOTAL).increment(1);
}

// =============================================================================
// Batch Metrics
// =============================================================================

/// Record a batch call of `size` requests.
pub fn record_batch(size: usize, duration: Duration) {
    counter!(names::BATCH_REQUESTS_TOTAL).increment(size as u64);
    histogram!(names::BATCH_DURATION_SECONDS).record(duration.as_secs_f64());
}

// =============================================================================
// Consistency Metrics
// =============================================================================

pub fn record_consistency_check(consistent: bool) {
    let result = if consistent { "consistent" } else { "inconsistent" };
    counter!(names::CONSISTENCY_CHECKS_TOTAL, "result" => result).increment(1);
}
