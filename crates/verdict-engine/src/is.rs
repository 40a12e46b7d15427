//! Is: evaluate one package and answer each requested decision with a
//! boolean, logging exactly one record per successful call.

use std::collections::BTreeMap;

use verdict_core::{
    resolve_outcome, DecisionError, DecisionLogRecord, DecisionUser, EvaluationInput,
};
use verdict_runtime::EvalOptions;

use crate::authorizer::{evaluation_error, render_input, require_identity, Authorizer};
use crate::requests::{Decision, IsRequest, IsResponse};
use crate::scope::CallScope;

impl Authorizer {
    /// Answer every decision in `policy_context.decisions` for the package
    /// at `policy_context.path`.
    ///
    /// Decisions are returned in request order. The call fails if any
    /// decision cannot be resolved to a boolean, and nothing is logged in
    /// that case.
    pub async fn is(
        &self,
        scope: &CallScope,
        req: &IsRequest,
    ) -> Result<IsResponse, DecisionError> {
        let policy = &req.policy_context;
        if policy.path.is_empty() {
            return Err(DecisionError::invalid_argument("policy context path not set"));
        }
        if policy.decisions.is_empty() {
            return Err(DecisionError::invalid_argument(
                "policy context decisions not set",
            ));
        }
        let identity = require_identity(req.identity_context.as_ref())?;
        let resource = req.resource_context.clone().unwrap_or_default();

        let address = policy.address();
        let (user, runtime) = tokio::try_join!(
            self.resolve_subject(scope, identity),
            self.select_instance(scope, address.as_ref()),
        )?;

        let input = EvaluationInput {
            user: Some(user),
            identity: Some(identity.clone()),
            policy: Some(policy.clone()),
            resource: Some(resource.clone()),
            ..EvaluationInput::default()
        };
        let rendered = render_input(&input)?;
        let query = format!("x = data.{}", policy.path);

        let result = scope
            .run(runtime.evaluate(&query, &rendered, &EvalOptions::default()))
            .await?
            .map_err(|e| evaluation_error(&query, address.as_ref(), e))?;
        let value = result
            .first_binding("x")
            .ok_or_else(|| DecisionError::bad_query(&query, "undefined results"))?;

        let mut decisions = Vec::with_capacity(policy.decisions.len());
        let mut outcomes = BTreeMap::new();
        for name in &policy.decisions {
            let is = resolve_outcome(value, name).map_err(|source| {
                DecisionError::InvalidDecision {
                    decision: name.clone(),
                    source,
                }
            })?;
            outcomes.insert(name.clone(), is);
            decisions.push(Decision {
                decision: name.clone(),
                is,
            });
        }

        if let Some(logger) = &self.decision_log {
            let user = DecisionUser {
                context: identity.clone(),
                id: input.subject_id().unwrap_or_default().to_string(),
                email: input.subject_email().unwrap_or_default().to_string(),
            };
            let record = DecisionLogRecord::new(policy.clone(), user, resource, outcomes);
            scope
                .run(logger.log(&record))
                .await?
                .map_err(|e| {
                    tracing::error!(record_id = %record.id, error = %e, "failed to log decision");
                    DecisionError::DecisionLog {
                        record_id: record.id,
                        reason: e.to_string(),
                    }
                })?;
        }

        Ok(IsResponse { decisions })
    }
}
