//! # End-to-End Authorizer Tests
//!
//! Runs every operation against an in-memory directory and policy runtime.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use verdict_core::{
    DecisionError, DecisionLogRecord, IdentityContext, IdentityType, PathSeparator, PolicyContext,
    QueryOptions, TraceLevel,
};
use verdict_directory::MemoryDirectory;
use verdict_engine::{
    Authorizer, AuthorizerConfig, CallScope, CancelHandle, CompileRequest, DecisionLogError,
    DecisionLogger,
    DecisionTreeOptions, DecisionTreeRequest, IdentityResolver, IsRequest, MemoryDecisionLog,
    QueryRequest,
};
use verdict_runtime::{
    CompileResult, EvalOptions, EvalResult, InstanceRegistry, PolicyRuntime, RuntimeError,
    StaticRuntime,
};

fn directory() -> MemoryDirectory {
    MemoryDirectory::from_json(json!({
        "users": [
            {
                "id": "u1",
                "display_name": "Alice",
                "properties": {"email": "alice@example.com"},
                "identities": ["alice@example.com", "alice"]
            },
            {
                "id": "u2",
                "display_name": "Bob",
                "properties": {},
                "identities": ["bob"]
            }
        ]
    }))
    .unwrap()
}

fn runtime() -> StaticRuntime {
    StaticRuntime::new()
        .with_package(
            "app.GET.resource",
            json!({"allowed": true, "visible": false, "label": "read"}),
        )
        .with_package("app.POST.resource", json!({"allowed": true, "enabled": false}))
        .with_package("app.DELETE.resource", json!({"allowed": {"allowed": false}}))
        .with_package("admin.users", json!({"allowed": 7}))
        .with_data("roles.admin", json!(["u1"]))
}

fn authorizer_with(config: AuthorizerConfig) -> (Authorizer, Arc<MemoryDecisionLog>) {
    let log = Arc::new(MemoryDecisionLog::default());
    let registry = InstanceRegistry::new().with_default(Arc::new(runtime()));
    let authorizer = Authorizer::new(
        config,
        Arc::new(registry),
        IdentityResolver::new(Arc::new(directory())),
    )
    .with_decision_log(log.clone());
    (authorizer, log)
}

fn authorizer() -> (Authorizer, Arc<MemoryDecisionLog>) {
    authorizer_with(AuthorizerConfig::default())
}

fn alice() -> Option<IdentityContext> {
    Some(IdentityContext::new(IdentityType::Sub, "alice@example.com"))
}

fn is_request(path: &str, decisions: &[&str]) -> IsRequest {
    IsRequest {
        identity_context: alice(),
        policy_context: PolicyContext::new(path, decisions.iter().copied()),
        resource_context: Some(Map::from_iter([("id".to_string(), json!("r1"))])),
    }
}

// -- Is ---------------------------------------------------------------------

#[tokio::test]
async fn is_answers_in_request_order_and_logs_once() {
    let (authorizer, log) = authorizer();
    let resp = authorizer
        .is(
            &CallScope::unbounded(),
            &is_request("app.POST.resource", &["enabled", "allowed"]),
        )
        .await
        .unwrap();

    let answers: Vec<(&str, bool)> = resp
        .decisions
        .iter()
        .map(|d| (d.decision.as_str(), d.is))
        .collect();
    assert_eq!(answers, [("enabled", false), ("allowed", true)]);

    let records = log.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.path, "app.POST.resource");
    assert_eq!(record.user.id, "u1");
    assert_eq!(record.user.email, "alice@example.com");
    assert_eq!(record.user.context.identity, "alice@example.com");
    assert_eq!(record.resource["id"], "r1");
    assert_eq!(record.outcomes.len(), 2);
    assert_eq!(record.outcomes["allowed"], true);
    assert_eq!(record.outcomes["enabled"], false);
}

#[tokio::test]
async fn is_unwraps_nested_outcomes() {
    let (authorizer, _) = authorizer();
    let resp = authorizer
        .is(
            &CallScope::unbounded(),
            &is_request("app.DELETE.resource", &["allowed"]),
        )
        .await
        .unwrap();
    assert!(!resp.decisions[0].is);
}

#[tokio::test]
async fn is_rejects_missing_path_and_decisions() {
    let (authorizer, log) = authorizer();
    let scope = CallScope::unbounded();

    let err = authorizer.is(&scope, &is_request("", &["allowed"])).await.unwrap_err();
    assert!(matches!(err, DecisionError::InvalidArgument(_)));

    let err = authorizer
        .is(&scope, &is_request("app.GET.resource", &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, DecisionError::InvalidArgument(_)));

    let mut req = is_request("app.GET.resource", &["allowed"]);
    req.identity_context = None;
    let err = authorizer.is(&scope, &req).await.unwrap_err();
    assert!(matches!(err, DecisionError::InvalidArgument(_)));

    assert!(log.is_empty());
}

#[tokio::test]
async fn is_fails_authentication_for_unknown_user() {
    let (authorizer, log) = authorizer();
    let mut req = is_request("app.GET.resource", &["allowed"]);
    req.identity_context = Some(IdentityContext::new(IdentityType::Jwt, "mallory"));

    let err = authorizer
        .is(&CallScope::unbounded(), &req)
        .await
        .unwrap_err();
    assert!(matches!(err, DecisionError::AuthenticationFailed(_)));
    assert!(log.is_empty());
}

#[tokio::test]
async fn is_anonymous_caller_skips_lookup() {
    let (authorizer, log) = authorizer();
    let mut req = is_request("app.GET.resource", &["allowed"]);
    req.identity_context = Some(IdentityContext::anonymous());

    let resp = authorizer.is(&CallScope::unbounded(), &req).await.unwrap();
    assert!(resp.decisions[0].is);
    assert_eq!(log.records()[0].user.id, "");
}

#[tokio::test]
async fn is_non_boolean_outcome_is_invalid_decision() {
    let (authorizer, log) = authorizer();
    let err = authorizer
        .is(&CallScope::unbounded(), &is_request("admin.users", &["allowed"]))
        .await
        .unwrap_err();
    match err {
        DecisionError::InvalidDecision { decision, .. } => assert_eq!(decision, "allowed"),
        other => panic!("expected InvalidDecision, got {other:?}"),
    }
    assert!(log.is_empty());
}

#[tokio::test]
async fn is_missing_decision_is_invalid_decision() {
    let (authorizer, _) = authorizer();
    let err = authorizer
        .is(
            &CallScope::unbounded(),
            &is_request("app.GET.resource", &["allowed", "deletable"]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DecisionError::InvalidDecision { ref decision, .. } if decision == "deletable"));
}

#[tokio::test]
async fn is_undefined_package_is_bad_query() {
    let (authorizer, _) = authorizer();
    let err = authorizer
        .is(&CallScope::unbounded(), &is_request("app.PATCH", &["allowed"]))
        .await
        .unwrap_err();
    assert!(matches!(err, DecisionError::BadQuery { ref query, .. } if query == "x = data.app.PATCH"));
}

struct RejectingLogger;

#[async_trait]
impl DecisionLogger for RejectingLogger {
    async fn log(&self, _record: &DecisionLogRecord) -> Result<(), DecisionLogError> {
        Err(DecisionLogError::Rejected("sink full".into()))
    }
}

#[tokio::test]
async fn is_fails_when_decision_log_rejects() {
    let registry = InstanceRegistry::new().with_default(Arc::new(runtime()));
    let authorizer = Authorizer::new(
        AuthorizerConfig::default(),
        Arc::new(registry),
        IdentityResolver::new(Arc::new(directory())),
    )
    .with_decision_log(Arc::new(RejectingLogger));

    let err = authorizer
        .is(
            &CallScope::unbounded(),
            &is_request("app.GET.resource", &["allowed"]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DecisionError::DecisionLog { .. }));
}

#[tokio::test]
async fn is_cancelled_before_start_does_nothing() {
    let (authorizer, log) = authorizer();
    let (scope, handle) = CallScope::cancellable();
    handle.cancel();

    let err = authorizer
        .is(&scope, &is_request("app.GET.resource", &["allowed"]))
        .await
        .unwrap_err();
    assert!(matches!(err, DecisionError::Cancelled));
    assert!(log.is_empty());
}

#[tokio::test]
async fn is_addressing_unknown_instance_fails() {
    let (authorizer, _) = authorizer();
    let mut req = is_request("app.GET.resource", &["allowed"]);
    req.policy_context = req.policy_context.with_instance("t1", "peoplefinder", "");

    let err = authorizer
        .is(&CallScope::unbounded(), &req)
        .await
        .unwrap_err();
    assert!(matches!(err, DecisionError::UnknownInstance { .. }));
}

#[tokio::test]
async fn is_uses_registered_instance_for_address() {
    let (authorizer, _) = authorizer();
    let tenant_runtime = StaticRuntime::new().with_package("app.GET.resource", json!({"allowed": false}));
    let address = verdict_core::InstanceAddress::new("t1", "peoplefinder", "").unwrap();
    authorizer
        .registry()
        .register(address, Arc::new(tenant_runtime));

    let mut req = is_request("app.GET.resource", &["allowed"]);
    req.policy_context = req.policy_context.with_instance("t1", "peoplefinder", "");
    let resp = authorizer.is(&CallScope::unbounded(), &req).await.unwrap();
    assert!(!resp.decisions[0].is);
}

// -- DecisionTree -----------------------------------------------------------

fn tree_request(path: &str, decisions: &[&str], sep: PathSeparator) -> DecisionTreeRequest {
    DecisionTreeRequest {
        identity_context: alice(),
        policy_context: PolicyContext::new(path, decisions.iter().copied()),
        resource_context: None,
        options: Some(DecisionTreeOptions {
            path_separator: sep,
        }),
    }
}

#[tokio::test]
async fn decision_tree_reports_boolean_fields_under_prefix() {
    let (authorizer, log) = authorizer();
    let resp = authorizer
        .decision_tree(
            &CallScope::unbounded(),
            &tree_request("app", &["*"], PathSeparator::Dot),
        )
        .await
        .unwrap();

    assert_eq!(resp.path_root, "app");
    assert_eq!(resp.path.len(), 2);
    let get = &resp.path["app.GET.resource"];
    assert_eq!(get.len(), 2);
    assert_eq!(get["allowed"], true);
    assert_eq!(get["visible"], false);
    assert_eq!(resp.path["app.POST.resource"]["enabled"], false);
    // Nested outcomes are not booleans, so DELETE contributes nothing.
    assert!(!resp.path.contains_key("app.DELETE.resource"));
    assert!(log.is_empty());
}

#[tokio::test]
async fn decision_tree_filters_requested_decisions() {
    let (authorizer, _) = authorizer();
    let resp = authorizer
        .decision_tree(
            &CallScope::unbounded(),
            &tree_request("app/GET", &["visible"], PathSeparator::Slash),
        )
        .await
        .unwrap();

    assert_eq!(resp.path_root, "app/GET");
    assert_eq!(resp.path.len(), 1);
    let get = &resp.path["app/GET/resource"];
    assert_eq!(get.len(), 1);
    assert_eq!(get["visible"], false);
}

#[tokio::test]
async fn decision_tree_with_no_matching_packages_is_empty() {
    let (authorizer, _) = authorizer();
    let resp = authorizer
        .decision_tree(
            &CallScope::unbounded(),
            &tree_request("billing", &["*"], PathSeparator::Dot),
        )
        .await
        .unwrap();
    assert!(resp.path.is_empty());
}

#[tokio::test]
async fn decision_tree_rejects_unknown_separator_and_identity() {
    let (authorizer, _) = authorizer();
    let scope = CallScope::unbounded();

    let err = authorizer
        .decision_tree(&scope, &tree_request("app", &["*"], PathSeparator::Unknown))
        .await
        .unwrap_err();
    assert!(matches!(err, DecisionError::InvalidArgument(_)));

    let mut req = tree_request("app", &["*"], PathSeparator::Dot);
    req.identity_context = Some(IdentityContext::new(IdentityType::Unknown, "alice"));
    let err = authorizer.decision_tree(&scope, &req).await.unwrap_err();
    assert!(matches!(err, DecisionError::InvalidArgument(_)));
}

#[tokio::test]
async fn decision_tree_empty_prefix_covers_all_packages() {
    let registry = InstanceRegistry::new().with_default(Arc::new(
        StaticRuntime::new().with_package("app.GET", json!({"allowed": true})),
    ));
    let authorizer = Authorizer::new(
        AuthorizerConfig::default(),
        Arc::new(registry),
        IdentityResolver::new(Arc::new(directory())),
    );
    let resp = authorizer
        .decision_tree(
            &CallScope::unbounded(),
            &tree_request("", &["allowed"], PathSeparator::Slash),
        )
        .await
        .unwrap();
    assert_eq!(resp.path_root, "");
    assert!(resp.path["app/GET"]["allowed"]);
}

/// Lists `app.a`, `app.m.x` and `app.z` but only defines `app.a` and `app.z`.
/// Optionally cancels its scope once the first package has been evaluated.
struct PartialRuntime {
    inner: StaticRuntime,
    evaluated: AtomicUsize,
    cancel_after_first: Option<CancelHandle>,
}

impl PartialRuntime {
    fn new(cancel_after_first: Option<CancelHandle>) -> Self {
        Self {
            inner: StaticRuntime::new()
                .with_package("app.a", json!({"allowed": true}))
                .with_package("app.z", json!({"allowed": true})),
            evaluated: AtomicUsize::new(0),
            cancel_after_first,
        }
    }
}

#[async_trait]
impl PolicyRuntime for PartialRuntime {
    async fn list_packages(&self, _internal_prefix: &str) -> Result<Vec<String>, RuntimeError> {
        Ok(vec!["app.a".into(), "app.m.x".into(), "app.z".into()])
    }

    async fn evaluate(
        &self,
        query: &str,
        input: &Value,
        options: &EvalOptions,
    ) -> Result<EvalResult, RuntimeError> {
        self.evaluated.fetch_add(1, Ordering::SeqCst);
        let result = self.inner.evaluate(query, input, options).await;
        if let Some(handle) = &self.cancel_after_first {
            handle.cancel();
        }
        result
    }

    async fn compile(
        &self,
        query: &str,
        input: &Value,
        unknowns: &[String],
        disable_inlining: bool,
        options: &EvalOptions,
    ) -> Result<CompileResult, RuntimeError> {
        self.inner
            .compile(query, input, unknowns, disable_inlining, options)
            .await
    }
}

fn authorizer_over(runtime: Arc<PartialRuntime>) -> Authorizer {
    let registry = InstanceRegistry::new().with_default(runtime);
    Authorizer::new(
        AuthorizerConfig::default(),
        Arc::new(registry),
        IdentityResolver::new(Arc::new(directory())),
    )
}

#[tokio::test]
async fn decision_tree_aborts_on_undefined_package() {
    let runtime = Arc::new(PartialRuntime::new(None));
    let authorizer = authorizer_over(runtime.clone());

    let result = authorizer
        .decision_tree(
            &CallScope::unbounded(),
            &tree_request("app", &["*"], PathSeparator::Dot),
        )
        .await;
    match result {
        Err(DecisionError::BadQuery { query, .. }) => assert_eq!(query, "x = data.app.m.x"),
        other => panic!("expected BadQuery, got {other:?}"),
    }
    // app.z is never reached once app.m.x fails.
    assert_eq!(runtime.evaluated.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn decision_tree_stops_when_cancelled_between_packages() {
    let (scope, handle) = CallScope::cancellable();
    let runtime = Arc::new(PartialRuntime::new(Some(handle)));
    let authorizer = authorizer_over(runtime.clone());

    let result = authorizer
        .decision_tree(&scope, &tree_request("app", &["*"], PathSeparator::Dot))
        .await;
    assert!(matches!(result, Err(DecisionError::Cancelled)), "{result:?}");
    assert_eq!(runtime.evaluated.load(Ordering::SeqCst), 1);
}

// -- Query / Compile --------------------------------------------------------

#[tokio::test]
async fn query_merges_raw_input_with_resolved_user() {
    let (authorizer, _) = authorizer();
    let req = QueryRequest {
        query: "x = input".into(),
        input: r#"{"action": "read", "user": "spoofed"}"#.into(),
        identity_context: alice(),
        resource_context: Some(Map::from_iter([("id".to_string(), json!("r1"))])),
        ..QueryRequest::default()
    };
    let resp = authorizer.query(&CallScope::unbounded(), &req).await.unwrap();

    let x = &resp.response["result"][0]["x"];
    assert_eq!(x["action"], "read");
    assert_eq!(x["user"]["id"], "u1");
    assert_eq!(x["identity"]["identity"], "alice@example.com");
    assert_eq!(x["resource"]["id"], "r1");
    assert!(x.get("policy").is_none());
    assert!(resp.metrics.is_empty());
}

#[tokio::test]
async fn query_respects_disabled_contexts() {
    let (authorizer, _) = authorizer_with(AuthorizerConfig {
        enable_resource_context: false,
        enable_identity_context: false,
    });
    let req = QueryRequest {
        query: "x = input".into(),
        identity_context: Some(IdentityContext::new(IdentityType::Sub, "nobody")),
        resource_context: Some(Map::new()),
        ..QueryRequest::default()
    };
    let resp = authorizer.query(&CallScope::unbounded(), &req).await.unwrap();
    assert_eq!(resp.response, json!({"result": [{"x": {}}]}));
}

#[tokio::test]
async fn query_undefined_result_is_empty_not_error() {
    let (authorizer, _) = authorizer();
    let req = QueryRequest {
        query: "x = data.nothing.here".into(),
        ..QueryRequest::default()
    };
    let resp = authorizer.query(&CallScope::unbounded(), &req).await.unwrap();
    assert_eq!(resp.response, json!({"result": []}));
}

#[tokio::test]
async fn query_rejects_bad_requests() {
    let (authorizer, _) = authorizer();
    let scope = CallScope::unbounded();

    let empty = QueryRequest::default();
    assert!(matches!(
        authorizer.query(&scope, &empty).await,
        Err(DecisionError::InvalidArgument(_))
    ));

    let malformed = QueryRequest {
        query: "x = input".into(),
        input: "{oops".into(),
        ..QueryRequest::default()
    };
    assert!(matches!(
        authorizer.query(&scope, &malformed).await,
        Err(DecisionError::InvalidArgument(_))
    ));

    let unknown = QueryRequest {
        query: "x = input".into(),
        identity_context: Some(IdentityContext::new(IdentityType::Unknown, "alice")),
        ..QueryRequest::default()
    };
    assert!(matches!(
        authorizer.query(&scope, &unknown).await,
        Err(DecisionError::InvalidArgument(_))
    ));

    let unparsable = QueryRequest {
        query: "x == data.roles".into(),
        ..QueryRequest::default()
    };
    assert!(matches!(
        authorizer.query(&scope, &unparsable).await,
        Err(DecisionError::BadQuery { .. })
    ));
}

#[tokio::test]
async fn query_reports_metrics_and_trace_summary() {
    let (authorizer, _) = authorizer();
    let req = QueryRequest {
        query: "x = data.roles.admin".into(),
        options: Some(QueryOptions {
            metrics: true,
            trace: TraceLevel::Full,
            trace_summary: true,
            ..QueryOptions::default()
        }),
        ..QueryRequest::default()
    };
    let resp = authorizer.query(&CallScope::unbounded(), &req).await.unwrap();
    assert_eq!(resp.response["result"][0]["x"], json!(["u1"]));
    assert!(resp.metrics.contains_key("timer_rego_query_eval_ns"));
    assert!(!resp.trace_summary.is_empty());
    assert!(resp.trace.is_empty());
}

#[tokio::test]
async fn query_with_addressable_policy_context_sets_input_policy() {
    let (authorizer, _) = authorizer();
    let address = verdict_core::InstanceAddress::new("t1", "", "prod").unwrap();
    authorizer
        .registry()
        .register(address, Arc::new(StaticRuntime::new()));

    let req = QueryRequest {
        query: "x = input.policy".into(),
        policy_context: Some(PolicyContext::new("app", ["*"]).with_instance("t1", "", "prod")),
        ..QueryRequest::default()
    };
    let resp = authorizer.query(&CallScope::unbounded(), &req).await.unwrap();
    assert_eq!(resp.response["result"][0]["x"]["instance_label"], "prod");
}

#[tokio::test]
async fn compile_returns_residual_for_unknowns() {
    let (authorizer, _) = authorizer();
    let req = CompileRequest {
        query: "input.resource.owner".into(),
        unknowns: vec!["input.resource".into()],
        disable_inlining: true,
        ..CompileRequest::default()
    };
    let resp = authorizer.compile(&CallScope::unbounded(), &req).await.unwrap();
    assert_eq!(resp.result["queries"], json!([["input.resource.owner"]]));

    let req = CompileRequest {
        query: "data.roles.admin".into(),
        unknowns: vec!["input.resource".into()],
        ..CompileRequest::default()
    };
    let resp = authorizer.compile(&CallScope::unbounded(), &req).await.unwrap();
    assert_eq!(resp.result["queries"], json!([[]]));
}

#[tokio::test]
async fn compile_requires_query() {
    let (authorizer, _) = authorizer();
    let err = authorizer
        .compile(&CallScope::unbounded(), &CompileRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DecisionError::InvalidArgument(_)));
}

#[tokio::test]
async fn compile_respects_disabled_contexts() {
    let req = CompileRequest {
        query: "input.resource.owner".into(),
        identity_context: Some(IdentityContext::new(IdentityType::Sub, "nobody")),
        resource_context: Some(Map::from_iter([("owner".to_string(), json!("u1"))])),
        ..CompileRequest::default()
    };

    // Enabled: the resource is part of the input, so the query always holds,
    // and the unknown identity fails the lookup.
    let (authorizer, _) = authorizer();
    let err = authorizer
        .compile(&CallScope::unbounded(), &req)
        .await
        .unwrap_err();
    assert!(matches!(err, DecisionError::AuthenticationFailed(_)));

    let mut anonymous = req.clone();
    anonymous.identity_context = None;
    let resp = authorizer
        .compile(&CallScope::unbounded(), &anonymous)
        .await
        .unwrap();
    assert_eq!(resp.result["queries"], json!([[]]));

    // Disabled: neither context reaches the runtime and no lookup happens.
    let (authorizer, _) = authorizer_with(AuthorizerConfig {
        enable_resource_context: false,
        enable_identity_context: false,
    });
    let resp = authorizer
        .compile(&CallScope::unbounded(), &req)
        .await
        .unwrap();
    assert!(resp.result.is_empty());
}
