//! # API Error Types
//!
//! Maps [`DecisionError`] kinds to HTTP status codes and JSON bodies of the
//! form `{"error": {"code": ..., "message": ...}}`. Internal failure details
//! are logged, never returned.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use verdict_core::DecisionError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code, e.g. `"BAD_QUERY"`.
    pub code: String,
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// The request body or a header could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid bearer token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A decision operation failed.
    #[error(transparent)]
    Decision(#[from] DecisionError),
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Decision(err) => match err {
                DecisionError::InvalidArgument(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT")
                }
                DecisionError::AuthenticationFailed(_) => {
                    (StatusCode::NOT_FOUND, "AUTHENTICATION_FAILED")
                }
                DecisionError::BadQuery { .. } => (StatusCode::BAD_REQUEST, "BAD_QUERY"),
                DecisionError::InvalidDecision { .. } => {
                    (StatusCode::BAD_REQUEST, "INVALID_DECISION")
                }
                DecisionError::UnknownInstance { .. } => {
                    (StatusCode::NOT_FOUND, "INSTANCE_NOT_FOUND")
                }
                DecisionError::InstanceUnavailable { .. } => {
                    (StatusCode::BAD_GATEWAY, "RUNTIME_UNAVAILABLE")
                }
                DecisionError::DecisionLog { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "DECISION_LOG_FAILED")
                }
                DecisionError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED"),
                DecisionError::DeadlineExceeded => {
                    (StatusCode::GATEWAY_TIMEOUT, "DEADLINE_EXCEEDED")
                }
                DecisionError::Internal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Decision(DecisionError::Internal(_)) => "An internal error occurred".to_string(),
            Self::Decision(DecisionError::InstanceUnavailable { address, .. }) => {
                format!("policy instance {address} is unavailable")
            }
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        } else {
            tracing::debug!(error = %self, code, "request rejected");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use verdict_core::OutcomeError;

    fn status_of(err: DecisionError) -> (StatusCode, &'static str) {
        AppError::from(err).status_and_code()
    }

    #[test]
    fn decision_errors_map_to_documented_statuses() {
        assert_eq!(
            status_of(DecisionError::invalid_argument("x")),
            (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT")
        );
        assert_eq!(
            status_of(DecisionError::AuthenticationFailed("x".into())),
            (StatusCode::NOT_FOUND, "AUTHENTICATION_FAILED")
        );
        assert_eq!(
            status_of(DecisionError::bad_query("q", "r")),
            (StatusCode::BAD_REQUEST, "BAD_QUERY")
        );
        assert_eq!(
            status_of(DecisionError::InvalidDecision {
                decision: "allowed".into(),
                source: OutcomeError::Missing("allowed".into()),
            }),
            (StatusCode::BAD_REQUEST, "INVALID_DECISION")
        );
        assert_eq!(
            status_of(DecisionError::UnknownInstance {
                address: "t/p@".into()
            }),
            (StatusCode::NOT_FOUND, "INSTANCE_NOT_FOUND")
        );
        assert_eq!(
            status_of(DecisionError::InstanceUnavailable {
                address: "t/p@".into(),
                reason: "connection refused".into(),
            }),
            (StatusCode::BAD_GATEWAY, "RUNTIME_UNAVAILABLE")
        );
        assert_eq!(
            status_of(DecisionError::DeadlineExceeded).0,
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(status_of(DecisionError::Cancelled).0, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn internal_details_are_not_exposed() {
        let resp =
            AppError::from(DecisionError::Internal("secret stack trace".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert!(!body.error.message.contains("secret"));
    }

    #[tokio::test]
    async fn unavailable_instance_hides_transport_reason() {
        let resp = AppError::from(DecisionError::InstanceUnavailable {
            address: "acme/peoplefinder@".into(),
            reason: "tcp connect error 10.0.0.7:8181".into(),
        })
        .into_response();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert!(body.error.message.contains("acme/peoplefinder@"));
        assert!(!body.error.message.contains("10.0.0.7"));
    }
}
