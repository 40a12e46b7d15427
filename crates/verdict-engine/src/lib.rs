//! # verdict-engine: Decision Orchestration
//!
//! Turns authorization requests into policy evaluations and structured
//! answers. Each operation runs the same pipeline:
//!
//! 1. Validate the request.
//! 2. Resolve the caller's identity through the directory and, concurrently,
//!    select the addressed policy instance.
//! 3. Assemble the evaluation input (`user`, `identity`, `policy`,
//!    `resource`, plus caller-supplied fields for ad-hoc queries).
//! 4. Evaluate and shape the result.
//!
//! | Operation | Evaluates | Answer |
//! |-----------|-----------|--------|
//! | [`Authorizer::decision_tree`] | every package under a path prefix | passing boolean decisions per package |
//! | [`Authorizer::is`] | one package | one boolean per requested decision, logged |
//! | [`Authorizer::query`] | an arbitrary query | raw bindings, metrics, trace |
//! | [`Authorizer::compile`] | an arbitrary query, partially | residual queries |
//!
//! Every collaborator call is bounded by the request's [`CallScope`].

pub mod authorizer;
pub mod decision_log;
mod is;
mod query;
pub mod requests;
pub mod resolver;
pub mod scope;
mod tree;

pub use authorizer::{Authorizer, AuthorizerConfig};
pub use decision_log::{
    DecisionLogError, DecisionLogger, FileDecisionLogger, MemoryDecisionLog, TracingDecisionLogger,
};
pub use requests::{
    CompileRequest, CompileResponse, Decision, DecisionTree, DecisionTreeOptions,
    DecisionTreeRequest, DecisionTreeResponse, IsRequest, IsResponse, QueryRequest, QueryResponse,
};
pub use resolver::{IdentityResolver, ResolveError};
pub use scope::{CallScope, CancelHandle};
