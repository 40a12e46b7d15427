//! DecisionTree: evaluate every package under a path prefix and collect the
//! boolean decisions each one exposes.

use verdict_core::{
    boolean_fields, packages_under, DecisionError, DecisionFilter, EvaluationInput, PathSeparator,
};
use verdict_runtime::EvalOptions;

use crate::authorizer::{
    address_label, evaluation_error, render_input, require_identity, Authorizer,
};
use crate::requests::{DecisionTree, DecisionTreeRequest, DecisionTreeResponse};
use crate::scope::CallScope;

impl Authorizer {
    /// Walk the packages under `policy_context.path` one at a time.
    ///
    /// Only boolean fields accepted by the decision filter are reported;
    /// packages contributing none are left out. Any package failing to
    /// evaluate fails the whole call.
    pub async fn decision_tree(
        &self,
        scope: &CallScope,
        req: &DecisionTreeRequest,
    ) -> Result<DecisionTreeResponse, DecisionError> {
        let identity = require_identity(req.identity_context.as_ref())?;
        let separator = req.options.unwrap_or_default().path_separator;
        if separator == PathSeparator::Unknown {
            return Err(DecisionError::invalid_argument("path separator UNKNOWN"));
        }

        let policy = &req.policy_context;
        let address = policy.address();
        let (user, runtime) = tokio::try_join!(
            self.resolve_subject(scope, identity),
            self.select_instance(scope, address.as_ref()),
        )?;

        let internal_prefix = separator
            .to_internal(&policy.path)
            .map_err(|e| DecisionError::invalid_argument(e.to_string()))?;
        let names = scope
            .run(runtime.list_packages(&internal_prefix))
            .await?
            .map_err(|e| DecisionError::InstanceUnavailable {
                address: address_label(address.as_ref()),
                reason: format!("failed to list policy packages: {e}"),
            })?;
        let packages = packages_under(names, separator, &policy.path)
            .map_err(|e| DecisionError::invalid_argument(e.to_string()))?;

        let filter = DecisionFilter::new(&policy.decisions);
        let resource = req.resource_context.clone().unwrap_or_default();
        let options = EvalOptions::default();
        let mut tree = DecisionTree::new();

        for package in &packages {
            scope.check()?;

            let input = EvaluationInput {
                user: Some(user.clone()),
                identity: Some(identity.clone()),
                policy: Some(policy.with_path(&package.path)),
                resource: Some(resource.clone()),
                ..EvaluationInput::default()
            };
            let input = render_input(&input)?;
            let query = format!("x = data.{}", package.package_name());

            let result = scope
                .run(runtime.evaluate(&query, &input, &options))
                .await?
                .map_err(|e| evaluation_error(&query, address.as_ref(), e))?;
            let value = result
                .first_binding("x")
                .ok_or_else(|| DecisionError::bad_query(&query, "undefined results"))?;

            let decisions: Vec<(String, bool)> = boolean_fields(value)
                .into_iter()
                .filter(|(name, _)| filter.accepts(name))
                .collect();
            if decisions.is_empty() {
                continue;
            }
            tree.entry(package.path.clone())
                .or_default()
                .extend(decisions);
        }

        tracing::debug!(
            path_root = %policy.path,
            packages = packages.len(),
            reported = tree.len(),
            "decision tree evaluated"
        );
        Ok(DecisionTreeResponse {
            path_root: policy.path.clone(),
            path: tree,
        })
    }
}
