//! # Application State
//!
//! Shared state for the Axum application: the authorizer and the settings
//! handlers consult per request.

use std::sync::Arc;
use std::time::Duration;

use verdict_engine::Authorizer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub authorizer: Arc<Authorizer>,
    pub metrics: ApiMetrics,
    pub auth: AuthConfig,
    /// Deadline applied when a request does not carry its own.
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(authorizer: Arc<Authorizer>, metrics: ApiMetrics) -> Self {
        Self {
            authorizer,
            metrics,
            auth: AuthConfig::default(),
            request_timeout: Duration::from_millis(5000),
        }
    }

    /// Require `token` as bearer token on the `/api` routes.
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth = AuthConfig::new(token);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
