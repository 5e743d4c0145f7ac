//! Tracing setup with a log level that can be swapped at runtime.

use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER_HANDLE: OnceLock<FilterHandle> = OnceLock::new();

pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Install the global subscriber. `RUST_LOG`, when set and valid, wins over
/// `level`. Later calls are no-ops.
pub fn init_tracing_with_level(level: &str) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| filter_for(level));

    let (filter_layer, handle) = reload::Layer::new(filter);
    if FILTER_HANDLE.set(handle).is_err() {
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Switch to `level` (any `EnvFilter` directive). Returns false when tracing
/// was never initialized through this module.
pub fn apply_logging_level(level: &str) -> bool {
    if std::env::var_os("RUST_LOG").is_some() {
        tracing::debug!(level, "RUST_LOG is set; keeping its filter");
        return true;
    }
    let Some(handle) = FILTER_HANDLE.get() else {
        return false;
    };
    match handle.modify(|filter| *filter = filter_for(level)) {
        Ok(()) => {
            tracing::info!(level, "log level applied");
            true
        }
        Err(e) => {
            tracing::warn!(level, error = %e, "failed to apply log level");
            false
        }
    }
}

/// Unparseable directives fall back to `info`.
fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}
