//! # Authorizer
//!
//! The [`Authorizer`] owns the shared collaborators of every operation: the
//! instance registry, the identity resolver, and the optional decision log.
//! The four operations live in their own modules as `impl Authorizer`
//! blocks; this module holds configuration and the steps they share.

use std::sync::Arc;

use serde_json::{Map, Value};
use verdict_core::{
    DecisionError, EvaluationInput, IdentityContext, IdentityType, InstanceAddress, Subject,
};
use verdict_runtime::{InstanceRegistry, PolicyRuntime, RuntimeError};

use crate::decision_log::DecisionLogger;
use crate::resolver::{IdentityResolver, ResolveError};
use crate::scope::CallScope;

/// Input-merging switches for Query and Compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizerConfig {
    /// Merge the request's resource context into `input.resource`.
    pub enable_resource_context: bool,
    /// Resolve the request's identity context into `input.user`.
    pub enable_identity_context: bool,
}

impl Default for AuthorizerConfig {
    fn default() -> Self {
        Self {
            enable_resource_context: true,
            enable_identity_context: true,
        }
    }
}

/// Decision orchestration over isolated policy instances.
///
/// Cheap to share behind an `Arc`; every operation takes `&self` and a
/// [`CallScope`] bounding its collaborator calls.
pub struct Authorizer {
    pub(crate) config: AuthorizerConfig,
    pub(crate) registry: Arc<InstanceRegistry>,
    pub(crate) resolver: IdentityResolver,
    pub(crate) decision_log: Option<Arc<dyn DecisionLogger>>,
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("resolver", &self.resolver)
            .field("decision_log", &self.decision_log.is_some())
            .finish()
    }
}

impl Authorizer {
    pub fn new(
        config: AuthorizerConfig,
        registry: Arc<InstanceRegistry>,
        resolver: IdentityResolver,
    ) -> Self {
        Self {
            config,
            registry,
            resolver,
            decision_log: None,
        }
    }

    /// Emit a record for every successful Is call through `logger`.
    pub fn with_decision_log(mut self, logger: Arc<dyn DecisionLogger>) -> Self {
        self.decision_log = Some(logger);
        self
    }

    pub fn config(&self) -> &AuthorizerConfig {
        &self.config
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    /// The runtime for `address`, or the default instance.
    pub(crate) async fn select_instance(
        &self,
        scope: &CallScope,
        address: Option<&InstanceAddress>,
    ) -> Result<Arc<dyn PolicyRuntime>, DecisionError> {
        scope.check()?;
        self.registry
            .select(address)
            .map_err(|e| instance_error(address, e))
    }

    /// Resolve `ctx` to a subject. Any lookup failure is an authentication
    /// failure.
    pub(crate) async fn resolve_subject(
        &self,
        scope: &CallScope,
        ctx: &IdentityContext,
    ) -> Result<Subject, DecisionError> {
        self.resolver.resolve(scope, ctx).await.map_err(|e| match e {
            ResolveError::InvalidArgument(msg) => DecisionError::InvalidArgument(msg),
            ResolveError::Interrupted(inner) => inner,
            other => {
                tracing::error!(
                    identity_type = %ctx.identity_type,
                    error = %other,
                    "failed to resolve identity context"
                );
                DecisionError::AuthenticationFailed(other.to_string())
            }
        })
    }
}

/// Require a present identity context with a known type.
pub(crate) fn require_identity(
    ctx: Option<&IdentityContext>,
) -> Result<&IdentityContext, DecisionError> {
    let ctx = ctx.ok_or_else(|| DecisionError::invalid_argument("identity context not set"))?;
    if ctx.identity_type == IdentityType::Unknown {
        return Err(DecisionError::invalid_argument("identity type UNKNOWN"));
    }
    Ok(ctx)
}

/// Parse caller-supplied raw input. Blank text and `null` are empty input.
pub(crate) fn parse_raw_input(raw: &str) -> Result<Map<String, Value>, DecisionError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(DecisionError::invalid_argument(format!(
            "input must be a JSON object, got {}",
            json_type(&other)
        ))),
        Err(e) => Err(DecisionError::invalid_argument(format!(
            "failed to parse input as a JSON object: {e}"
        ))),
    }
}

pub(crate) fn render_input(input: &EvaluationInput) -> Result<Value, DecisionError> {
    let value = input.to_value()?;
    tracing::trace!(input = %value, "evaluation input");
    Ok(value)
}

/// Map an evaluation failure. Unreachable runtimes are instance failures;
/// everything else is a bad query.
pub(crate) fn evaluation_error(
    query: &str,
    address: Option<&InstanceAddress>,
    err: RuntimeError,
) -> DecisionError {
    match err {
        RuntimeError::Http { .. } => DecisionError::InstanceUnavailable {
            address: address_label(address),
            reason: err.to_string(),
        },
        RuntimeError::Query { reason, .. } => DecisionError::bad_query(query, reason),
        other => DecisionError::bad_query(query, other.to_string()),
    }
}

fn instance_error(address: Option<&InstanceAddress>, err: RuntimeError) -> DecisionError {
    match err {
        RuntimeError::InstanceNotFound(_) | RuntimeError::NoDefaultInstance => {
            DecisionError::UnknownInstance {
                address: address_label(address),
            }
        }
        other => DecisionError::InstanceUnavailable {
            address: address_label(address),
            reason: other.to_string(),
        },
    }
}

pub(crate) fn address_label(address: Option<&InstanceAddress>) -> String {
    address.map_or_else(|| "default".to_string(), ToString::to_string)
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdict_runtime::StaticRuntime;

    #[test]
    fn raw_input_accepts_objects_and_blank() {
        assert!(parse_raw_input("").unwrap().is_empty());
        assert!(parse_raw_input("  null ").unwrap().is_empty());
        let map = parse_raw_input(r#"{"a": 1}"#).unwrap();
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn raw_input_rejects_non_objects() {
        for raw in ["[1,2]", "42", r#""text""#, "{not json"] {
            let err = parse_raw_input(raw).unwrap_err();
            assert!(matches!(err, DecisionError::InvalidArgument(_)), "{raw}");
        }
    }

    #[test]
    fn identity_must_be_present_and_known() {
        assert!(matches!(
            require_identity(None),
            Err(DecisionError::InvalidArgument(_))
        ));
        let unknown = IdentityContext::new(IdentityType::Unknown, "x");
        assert!(require_identity(Some(&unknown)).is_err());
        let none = IdentityContext::anonymous();
        assert!(require_identity(Some(&none)).is_ok());
    }

    #[tokio::test]
    async fn missing_instance_is_unknown_instance() {
        let authorizer = Authorizer::new(
            AuthorizerConfig::default(),
            Arc::new(InstanceRegistry::new()),
            IdentityResolver::without_directory(),
        );
        let scope = CallScope::unbounded();

        let err = authorizer.select_instance(&scope, None).await.err().unwrap();
        assert!(matches!(err, DecisionError::UnknownInstance { ref address } if address == "default"));

        let addr = InstanceAddress::new("t1", "peoplefinder", "").unwrap();
        let err = authorizer
            .select_instance(&scope, Some(&addr))
            .await
            .err()
            .unwrap();
        assert!(
            matches!(err, DecisionError::UnknownInstance { ref address } if address == "t1/peoplefinder@")
        );
    }

    #[tokio::test]
    async fn registered_instance_is_selected() {
        let registry = InstanceRegistry::new().with_default(Arc::new(StaticRuntime::new()));
        let authorizer = Authorizer::new(
            AuthorizerConfig::default(),
            Arc::new(registry),
            IdentityResolver::without_directory(),
        );
        assert!(authorizer
            .select_instance(&CallScope::unbounded(), None)
            .await
            .is_ok());
    }

    #[test]
    fn runtime_failures_map_by_cause() {
        let err = evaluation_error(
            "x = data.a",
            None,
            RuntimeError::Query {
                query: "x = data.a".into(),
                reason: "rego_parse_error".into(),
            },
        );
        assert!(matches!(err, DecisionError::BadQuery { ref reason, .. } if reason == "rego_parse_error"));

        let err = evaluation_error(
            "x = data.a",
            None,
            RuntimeError::ApiError {
                endpoint: "/v1/query".into(),
                status: 500,
                body: "conflict".into(),
            },
        );
        assert!(matches!(err, DecisionError::BadQuery { .. }));
    }
}
