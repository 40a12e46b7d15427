//! Query and Compile: ad-hoc and partial evaluation against an instance.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use verdict_core::{
    DecisionError, EvaluationInput, IdentityContext, IdentityType, InstanceAddress,
    PolicyContext, QueryOptions,
};
use verdict_runtime::{EvalOptions, PolicyRuntime};

use crate::authorizer::{evaluation_error, parse_raw_input, render_input, Authorizer};
use crate::requests::{
    render_trace, CompileRequest, CompileResponse, QueryRequest, QueryResponse,
};
use crate::scope::CallScope;

/// Request fields shared by Query and Compile.
struct AdHoc<'a> {
    query: &'a str,
    input: &'a str,
    identity_context: Option<&'a IdentityContext>,
    resource_context: Option<&'a Map<String, Value>>,
    policy_context: Option<&'a PolicyContext>,
}

/// Assembled evaluation input and its target instance.
struct Prepared {
    input: Value,
    runtime: Arc<dyn PolicyRuntime>,
    address: Option<InstanceAddress>,
}

fn eval_options(options: &QueryOptions) -> EvalOptions {
    EvalOptions {
        explain: options.explain(),
        pretty: options.trace_summary,
        metrics: options.metrics,
        instrument: options.instrument,
    }
}

impl Authorizer {
    /// Evaluate an arbitrary query.
    ///
    /// Zero bindings is a successful, empty result.
    pub async fn query(
        &self,
        scope: &CallScope,
        req: &QueryRequest,
    ) -> Result<QueryResponse, DecisionError> {
        let prepared = self
            .prepare(
                scope,
                AdHoc {
                    query: &req.query,
                    input: &req.input,
                    identity_context: req.identity_context.as_ref(),
                    resource_context: req.resource_context.as_ref(),
                    policy_context: req.policy_context.as_ref(),
                },
            )
            .await?;
        let options = req.options.unwrap_or_default();

        let result = scope
            .run(
                prepared
                    .runtime
                    .evaluate(&req.query, &prepared.input, &eval_options(&options)),
            )
            .await?
            .map_err(|e| evaluation_error(&req.query, prepared.address.as_ref(), e))?;

        let (trace, trace_summary) = render_trace(result.explanation, options.trace_summary);
        Ok(QueryResponse {
            response: json!({ "result": result.bindings }),
            metrics: result.metrics.unwrap_or_default(),
            trace,
            trace_summary,
        })
    }

    /// Partially evaluate a query, treating `unknowns` as unknown.
    pub async fn compile(
        &self,
        scope: &CallScope,
        req: &CompileRequest,
    ) -> Result<CompileResponse, DecisionError> {
        let prepared = self
            .prepare(
                scope,
                AdHoc {
                    query: &req.query,
                    input: &req.input,
                    identity_context: req.identity_context.as_ref(),
                    resource_context: req.resource_context.as_ref(),
                    policy_context: req.policy_context.as_ref(),
                },
            )
            .await?;
        let options = req.options.unwrap_or_default();

        let result = scope
            .run(prepared.runtime.compile(
                &req.query,
                &prepared.input,
                &req.unknowns,
                req.disable_inlining,
                &eval_options(&options),
            ))
            .await?
            .map_err(|e| evaluation_error(&req.query, prepared.address.as_ref(), e))?;

        let (trace, trace_summary) = render_trace(result.explanation, options.trace_summary);
        Ok(CompileResponse {
            result: result.result,
            metrics: result.metrics.unwrap_or_default(),
            trace,
            trace_summary,
        })
    }

    /// Validate the request, merge the optional contexts into the caller's
    /// raw input, and select the target instance.
    async fn prepare(&self, scope: &CallScope, req: AdHoc<'_>) -> Result<Prepared, DecisionError> {
        if req.query.trim().is_empty() {
            return Err(DecisionError::invalid_argument("query not set"));
        }
        let mut input = EvaluationInput::from_raw(parse_raw_input(req.input)?);

        let address = req.policy_context.and_then(PolicyContext::address);
        if address.is_some() {
            input.policy = req.policy_context.cloned();
        }

        if self.config.enable_resource_context {
            input.resource = req.resource_context.cloned();
        }

        let mut lookup = None;
        if self.config.enable_identity_context {
            if let Some(ctx) = req.identity_context {
                match ctx.identity_type {
                    IdentityType::Unknown => {
                        return Err(DecisionError::invalid_argument("identity type UNKNOWN"))
                    }
                    IdentityType::None => {}
                    _ => {
                        input.identity = Some(ctx.clone());
                        lookup = Some(ctx);
                    }
                }
            }
        }

        let resolve = async {
            match lookup {
                Some(ctx) => self.resolve_subject(scope, ctx).await.map(Some),
                None => Ok(None),
            }
        };
        let (user, runtime) =
            tokio::try_join!(resolve, self.select_instance(scope, address.as_ref()))?;
        input.user = user;

        Ok(Prepared {
            input: render_input(&input)?,
            runtime,
            address,
        })
    }
}
