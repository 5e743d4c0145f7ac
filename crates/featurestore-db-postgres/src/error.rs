//! Error types for the PostgreSQL offline store.

use featurestore_core::TierError;
use sqlx_core::error::Error as SqlxError;

/// Tier name reported in [`TierError`]s raised by this crate.
pub const OFFLINE_TIER: &str = "offline";

/// Errors specific to the PostgreSQL offline store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection or query error.
    #[error("Database error: {0}")]
    Connection(#[from] SqlxError),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the database could not be reached at all, as opposed to a
    /// single statement failing.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::Connection(
                SqlxError::Io(_)
                    | SqlxError::Tls(_)
                    | SqlxError::PoolTimedOut
                    | SqlxError::PoolClosed
                    | SqlxError::WorkerCrashed
            )
        )
    }
}

impl From<PostgresError> for TierError {
    fn from(err: PostgresError) -> Self {
        if err.is_connectivity() {
            TierError::unavailable(OFFLINE_TIER, err.to_string())
        } else {
            TierError::lookup_failed(OFFLINE_TIER, err.to_string())
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
