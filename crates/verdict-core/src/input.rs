//! Evaluation input assembly.

use serde_json::{Map, Value};

use crate::identity::{IdentityContext, Subject};
use crate::policy::PolicyContext;

/// The merged object passed to the policy runtime as `input`.
///
/// Fields left as `None` are omitted from [`EvaluationInput::to_value`]
/// entirely; they never appear as `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationInput {
    /// Resolved subject, serialized as `input.user`.
    pub user: Option<Subject>,
    /// Caller's identity claim, serialized as `input.identity`.
    pub identity: Option<IdentityContext>,
    /// Policy addressing, serialized as `input.policy`.
    pub policy: Option<PolicyContext>,
    /// Resource attributes, serialized as `input.resource`.
    pub resource: Option<Map<String, Value>>,
    /// Caller-supplied free-form fields. The typed fields above take
    /// precedence on key collision.
    pub extra: Map<String, Value>,
}

impl EvaluationInput {
    /// Start from caller-supplied raw input.
    pub fn from_raw(extra: Map<String, Value>) -> Self {
        Self {
            extra,
            ..Self::default()
        }
    }

    /// Render as a JSON object.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let mut obj = self.extra.clone();
        if let Some(user) = &self.user {
            obj.insert("user".into(), serde_json::to_value(user)?);
        }
        if let Some(identity) = &self.identity {
            obj.insert("identity".into(), serde_json::to_value(identity)?);
        }
        if let Some(policy) = &self.policy {
            obj.insert("policy".into(), serde_json::to_value(policy)?);
        }
        if let Some(resource) = &self.resource {
            obj.insert("resource".into(), Value::Object(resource.clone()));
        }
        Ok(Value::Object(obj))
    }

    /// Subject id, if a non-empty one is present.
    pub fn subject_id(&self) -> Option<&str> {
        self.user
            .as_ref()
            .map(|u| u.id.as_str())
            .filter(|id| !id.is_empty())
    }

    /// Subject email, falling back to `user.properties.email`.
    pub fn subject_email(&self) -> Option<&str> {
        self.user.as_ref().and_then(Subject::email)
    }
}
