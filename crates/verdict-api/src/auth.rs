//! # Authentication Middleware
//!
//! Static bearer-token check for the `/api` routes. Health probes and the
//! metrics scrape stay unauthenticated.

use axum::extract::Request;
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::AppError;

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub token: Option<Zeroizing<String>>,
}

impl AuthConfig {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.map(Zeroizing::new),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Constant-time comparison of bearer tokens.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Reject requests without the configured bearer token.
///
/// When no token is configured every request passes.
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.token.clone());
    let Some(expected) = expected else {
        return next.run(request).await;
    };

    let checked = match request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        None => Err("missing authorization header"),
        Some(value) => match value.strip_prefix("Bearer ") {
            None => Err("authorization header must use Bearer scheme"),
            Some(provided) if constant_time_token_eq(provided, &expected) => Ok(()),
            Some(_) => Err("invalid bearer token"),
        },
    };

    match checked {
        Ok(()) => next.run(request).await,
        Err(reason) => {
            tracing::warn!(%reason, "authentication failed");
            AppError::Unauthorized(reason.into()).into_response()
        }
    }
}
