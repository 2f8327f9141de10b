//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. Route handlers return
//! `Result<T, AppError>`.
//!
//! Upstream HTTP errors are special: the upstream's status code and body
//! pass through to the caller unmodified, so the browser-side client sees
//! exactly what the commerce API returned. `AppError` is therefore `Clone`
//! (variants carry rendered data rather than source errors), which also lets
//! the response cache hand one error to every coalesced in-flight caller.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::bigcommerce::BigcommerceError;

/// Application-level error type for the middleware.
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// The upstream API answered with a non-2xx status; passed through.
    #[error("Upstream returned HTTP {status}")]
    Upstream { status: u16, body: Value },

    /// Could not talk to the upstream API (connect, timeout, malformed body).
    #[error("Upstream transport error: {0}")]
    Transport(String),

    /// No integration with this name is configured.
    #[error("Unknown integration: {0}")]
    UnknownIntegration(String),

    /// The integration exposes no such method.
    #[error("Integration {integration} has no method {method}")]
    UnknownMethod {
        integration: String,
        method: String,
    },

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<BigcommerceError> for AppError {
    fn from(err: BigcommerceError) -> Self {
        match err {
            BigcommerceError::Upstream { status, body } => Self::Upstream { status, body },
            BigcommerceError::Http(_)
            | BigcommerceError::Parse(_)
            | BigcommerceError::MissingCanonicalUrl
            | BigcommerceError::UnexpectedPayload(_) => Self::Transport(err.to_string()),
            BigcommerceError::InvalidArguments(msg) => Self::BadRequest(msg),
            BigcommerceError::Configuration(msg) => Self::Internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server-side failures to Sentry; upstream and routing
        // errors are the caller's problem, not ours
        if matches!(self, Self::Transport(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let message = self.to_string();
        match self {
            Self::Upstream { status, body } => {
                let status =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                (status, Json(body)).into_response()
            }
            Self::Transport(_) => (
                StatusCode::BAD_GATEWAY,
                // Don't expose transport details to clients
                Json(json!({ "message": "Upstream service unavailable" })),
            )
                .into_response(),
            Self::UnknownIntegration(_) | Self::UnknownMethod { .. } => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
            }
            Self::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
            }
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Internal server error" })),
            )
                .into_response(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::UnknownMethod {
            integration: "bigcommerce".to_string(),
            method: "getSiite".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Integration bigcommerce has no method getSiite"
        );
    }

    #[test]
    fn test_upstream_error_keeps_status() {
        let err = AppError::Upstream {
            status: 404,
            body: json!({ "title": "Channel not found" }),
        };
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_upstream_error_invalid_status_becomes_bad_gateway() {
        let err = AppError::Upstream {
            status: 42,
            body: Value::Null,
        };
        assert_eq!(status_of(err), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            status_of(AppError::Transport("connection reset".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AppError::UnknownIntegration("magento".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
