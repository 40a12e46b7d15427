//! Request and response types of the four authorization operations.
//!
//! These are plain serde types so the HTTP layer can accept and return them
//! directly. Failed operations never produce a response value; errors carry
//! no partial decisions or trees.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use verdict_core::{IdentityContext, PathSeparator, PolicyContext, QueryOptions};

/// Options of a DecisionTree request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionTreeOptions {
    pub path_separator: PathSeparator,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionTreeRequest {
    pub identity_context: Option<IdentityContext>,
    pub policy_context: PolicyContext,
    pub resource_context: Option<Map<String, Value>>,
    pub options: Option<DecisionTreeOptions>,
}

/// External package path to its passing boolean decisions.
pub type DecisionTree = BTreeMap<String, BTreeMap<String, bool>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeResponse {
    /// The requested path prefix.
    pub path_root: String,
    pub path: DecisionTree,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IsRequest {
    pub identity_context: Option<IdentityContext>,
    pub policy_context: PolicyContext,
    pub resource_context: Option<Map<String, Value>>,
}

/// One named boolean outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub decision: String,
    pub is: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IsResponse {
    /// Outcomes in request order.
    pub decisions: Vec<Decision>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    pub query: String,
    /// Raw JSON object text merged into the evaluation input.
    pub input: String,
    pub options: Option<QueryOptions>,
    pub identity_context: Option<IdentityContext>,
    pub resource_context: Option<Map<String, Value>>,
    pub policy_context: Option<PolicyContext>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// `{"result": [bindings...]}`
    pub response: Value,
    pub metrics: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace_summary: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileRequest {
    pub query: String,
    /// Raw JSON object text merged into the evaluation input.
    pub input: String,
    pub unknowns: Vec<String>,
    pub disable_inlining: bool,
    pub options: Option<QueryOptions>,
    pub identity_context: Option<IdentityContext>,
    pub resource_context: Option<Map<String, Value>>,
    pub policy_context: Option<PolicyContext>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompileResponse {
    /// Residual queries and support rules.
    pub result: Map<String, Value>,
    pub metrics: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace_summary: Vec<String>,
}

/// Render a runtime explanation as summary strings or structured entries.
pub(crate) fn render_trace(
    explanation: Option<Vec<Value>>,
    summary: bool,
) -> (Vec<Value>, Vec<String>) {
    let Some(entries) = explanation else {
        return (Vec::new(), Vec::new());
    };
    if summary {
        let lines = entries
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
        (Vec::new(), lines)
    } else {
        (entries, Vec::new())
    }
}
