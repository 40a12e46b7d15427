//! # Authorization Routes
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST | `/api/v2/authz/decisiontree` | [`Authorizer::decision_tree`](verdict_engine::Authorizer::decision_tree) |
//! | POST | `/api/v2/authz/is` | [`Authorizer::is`](verdict_engine::Authorizer::is) |
//! | POST | `/api/v2/authz/query` | [`Authorizer::query`](verdict_engine::Authorizer::query) |
//! | POST | `/api/v2/authz/compile` | [`Authorizer::compile`](verdict_engine::Authorizer::compile) |

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use verdict_core::DecisionError;
use verdict_engine::{
    CompileRequest, CompileResponse, DecisionTreeRequest, DecisionTreeResponse, IsRequest,
    IsResponse, QueryRequest, QueryResponse,
};

use crate::error::AppError;
use crate::extractors::{PolicyHeaders, RequestScope};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v2/authz/decisiontree", post(decision_tree))
        .route("/api/v2/authz/is", post(is))
        .route("/api/v2/authz/query", post(query))
        .route("/api/v2/authz/compile", post(compile))
}

/// Count the outcome and convert it to a response.
fn respond<T>(
    state: &AppState,
    operation: &'static str,
    result: Result<T, DecisionError>,
) -> Result<Json<T>, AppError> {
    match result {
        Ok(value) => {
            state.metrics.record_decision(operation, "ok");
            Ok(Json(value))
        }
        Err(err) => {
            let err = AppError::from(err);
            state
                .metrics
                .record_decision(operation, err.status_and_code().1);
            Err(err)
        }
    }
}

async fn decision_tree(
    State(state): State<AppState>,
    RequestScope(scope): RequestScope,
    policy: PolicyHeaders,
    payload: Result<Json<DecisionTreeRequest>, JsonRejection>,
) -> Result<Json<DecisionTreeResponse>, AppError> {
    let Json(mut req) = payload?;
    policy.apply(&mut req.policy_context);
    let result = state.authorizer.decision_tree(&scope, &req).await;
    respond(&state, "decision_tree", result)
}

async fn is(
    State(state): State<AppState>,
    RequestScope(scope): RequestScope,
    policy: PolicyHeaders,
    payload: Result<Json<IsRequest>, JsonRejection>,
) -> Result<Json<IsResponse>, AppError> {
    let Json(mut req) = payload?;
    policy.apply(&mut req.policy_context);
    let result = state.authorizer.is(&scope, &req).await;
    respond(&state, "is", result)
}

async fn query(
    State(state): State<AppState>,
    RequestScope(scope): RequestScope,
    policy: PolicyHeaders,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(mut req) = payload?;
    policy.apply_optional(&mut req.policy_context);
    let result = state.authorizer.query(&scope, &req).await;
    respond(&state, "query", result)
}

async fn compile(
    State(state): State<AppState>,
    RequestScope(scope): RequestScope,
    policy: PolicyHeaders,
    payload: Result<Json<CompileRequest>, JsonRejection>,
) -> Result<Json<CompileResponse>, AppError> {
    let Json(mut req) = payload?;
    policy.apply_optional(&mut req.policy_context);
    let result = state.authorizer.compile(&scope, &req).await;
    respond(&state, "compile", result)
}
