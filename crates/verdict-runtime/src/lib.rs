//! # verdict-runtime -- Policy runtime collaborator
//!
//! The authorizer does not execute policy rules. It hands queries to a
//! [`PolicyRuntime`]: one compiled rule set plus one data store. Runtimes are
//! addressed per tenant through the [`InstanceRegistry`].
//!
//! ## Implementations
//!
//! - [`OpaHttpRuntime`]: an OPA-compatible REST engine (`/v1/policies`,
//!   `/v1/query`, `/v1/compile`).
//! - [`StaticRuntime`]: an in-memory runtime over a JSON data document,
//!   used by tests and local demos.
//!
//! Queries are strings of the form `x = data.app.GET.users`. A query that
//! produces no bindings is not an error at this layer; callers decide what
//! "undefined" means.

pub mod error;
pub mod memory;
pub mod opa;
pub mod registry;

pub use error::RuntimeError;
pub use memory::StaticRuntime;
pub use opa::{OpaConfig, OpaHttpRuntime, OpaRuntimeFactory};
pub use registry::{InstanceRegistry, RuntimeFactory};

use async_trait::async_trait;
use serde_json::{Map, Value};
use verdict_core::ExplainMode;

/// Evaluation knobs forwarded to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvalOptions {
    /// Explanation verbosity.
    pub explain: ExplainMode,
    /// Render explanations as human-readable strings.
    pub pretty: bool,
    /// Collect metrics.
    pub metrics: bool,
    /// Collect instrumentation.
    pub instrument: bool,
}

/// Output of a concrete evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvalResult {
    /// One binding set per solution. Empty means undefined.
    pub bindings: Vec<Map<String, Value>>,
    /// Runtime metrics when requested.
    pub metrics: Option<Map<String, Value>>,
    /// Explanation entries when requested.
    pub explanation: Option<Vec<Value>>,
}

impl EvalResult {
    /// Value bound to `var` in the first solution.
    pub fn first_binding(&self, var: &str) -> Option<&Value> {
        self.bindings.first().and_then(|b| b.get(var))
    }
}

/// Output of a partial evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompileResult {
    /// Residual queries and support rules, e.g. `{"queries": [[...]]}`.
    pub result: Map<String, Value>,
    /// Runtime metrics when requested.
    pub metrics: Option<Map<String, Value>>,
    /// Explanation entries when requested.
    pub explanation: Option<Vec<Value>>,
}

/// One isolated policy instance.
///
/// Implementations must be `Send + Sync`; a single instance is shared across
/// all in-flight requests addressing it.
#[async_trait]
pub trait PolicyRuntime: Send + Sync {
    /// Internal names of compiled packages starting with `internal_prefix`,
    /// in a stable order.
    async fn list_packages(&self, internal_prefix: &str) -> Result<Vec<String>, RuntimeError>;

    /// Evaluate `query` against `input`.
    async fn evaluate(
        &self,
        query: &str,
        input: &Value,
        options: &EvalOptions,
    ) -> Result<EvalResult, RuntimeError>;

    /// Partially evaluate `query`, treating `unknowns` as unknown terms.
    async fn compile(
        &self,
        query: &str,
        input: &Value,
        unknowns: &[String],
        disable_inlining: bool,
        options: &EvalOptions,
    ) -> Result<CompileResult, RuntimeError>;
}
