//! # verdict-api: HTTP Surface of the Verdict Authorizer
//!
//! ## API Surface
//!
//! | Path | Module | Auth |
//! |------|--------|------|
//! | `/api/v2/authz/*` | [`routes`] | bearer token when configured |
//! | `/health/liveness`, `/health/readiness` | this module | none |
//! | `/metrics` | [`middleware::metrics`] | none |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the application router.
///
/// Health probes and `/metrics` are mounted outside the auth middleware.
pub fn app(state: AppState) -> Router {
    let api = routes::router()
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(state.metrics.clone()))
        .layer(Extension(state.auth.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let unauthenticated = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics))
        .with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Ready once at least one policy instance can be selected.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.authorizer.registry();
    if registry.has_default() || !registry.is_empty() {
        (StatusCode::OK, Json(json!({"status": "ready"})))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not ready", "reason": "no policy instance configured"})),
        )
    }
}

async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let instances = state.authorizer.registry().len();
    state
        .metrics
        .policy_instances()
        .set(i64::try_from(instances).unwrap_or(i64::MAX));

    match state.metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
