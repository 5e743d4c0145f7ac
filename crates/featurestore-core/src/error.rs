use thiserror::Error;

/// Errors reported by a backing tier (remote cache or offline store).
///
/// "Value absent" is never an error; tiers report it as `None`.
#[derive(Debug, Clone, Error)]
pub enum TierError {
    /// The tier could not be reached (connection, pool checkout, timeout).
    #[error("{tier} tier unavailable: {message}")]
    Unavailable { tier: &'static str, message: String },

    /// The tier answered but a single lookup failed.
    #[error("{tier} lookup failed: {message}")]
    LookupFailed { tier: &'static str, message: String },
}

impl TierError {
    /// Create a new Unavailable error
    pub fn unavailable(tier: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            tier,
            message: message.into(),
        }
    }

    /// Create a new LookupFailed error
    pub fn lookup_failed(tier: &'static str, message: impl Into<String>) -> Self {
        Self::LookupFailed {
            tier,
            message: message.into(),
        }
    }

    pub fn tier(&self) -> &'static str {
        match self {
            Self::Unavailable { tier, .. } | Self::LookupFailed { tier, .. } => tier,
        }
    }
}

/// Errors that abort a resolution.
///
/// Offline lookup failures and unparseable values never surface here; the
/// resolver recovers from them locally.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The remote cache could not serve the batched lookup.
    #[error("remote cache tier unavailable: {0}")]
    TierUnavailable(#[source] TierError),

    /// The caller-supplied deadline elapsed before resolution finished.
    #[error("resolution deadline exceeded")]
    DeadlineExceeded,

    /// A resolution task panicked or was cancelled.
    #[error("resolution task failed: {0}")]
    Internal(String),
}

impl ResolveError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
