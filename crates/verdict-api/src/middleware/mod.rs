//! # Middleware Stack
//!
//! - [`metrics`]: Prometheus request metrics.
//!
//! Request tracing uses `tower_http::trace::TraceLayer` directly and bearer
//! authentication lives in [`crate::auth`].

pub mod metrics;
