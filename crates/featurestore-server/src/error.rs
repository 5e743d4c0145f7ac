//! HTTP error responses.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use featurestore_core::{ResolveError, TierError};
use serde_json::json;
use thiserror::Error;

/// Errors returned by the feature endpoints.
///
/// Rendered as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete request body (400).
    #[error("{0}")]
    BadRequest(String),

    /// Body exceeds the configured limit (413).
    #[error("{0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A backing tier failed outside of resolution (503).
    #[error(transparent)]
    Tier(#[from] TierError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Resolve(ResolveError::TierUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Resolve(ResolveError::DeadlineExceeded) => StatusCode::GATEWAY_TIMEOUT,
            Self::Resolve(ResolveError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Tier(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::BadRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
