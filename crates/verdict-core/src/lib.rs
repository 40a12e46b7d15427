#![deny(missing_docs)]

//! # verdict-core: Foundational Types for the verdict Authorizer
//!
//! This crate defines the request-scoped data model that every other crate in
//! the workspace shares. It performs no I/O and depends only on `serde`,
//! `serde_json`, `thiserror`, `chrono`, and `uuid`.
//!
//! ## Design Principles
//!
//! 1. **Typed request context.** Policy addressing travels as an explicit
//!    [`PolicyContext`] value constructed once at the request boundary. The
//!    decision tree walk derives a copy per package instead of mutating it.
//!
//! 2. **Internal package names never leak.** [`PackageDescriptor`] keeps the
//!    engine-side name private; callers only ever see the external path.
//!
//! 3. **Outcome shapes are tagged.** [`OutcomeShape`] classifies a rule
//!    result as boolean, mapping, or something else, and
//!    [`resolve_outcome`] unwraps it with a bounded depth.
//!
//! 4. **[`DecisionError`] is the single engine error.** Every failure maps to
//!    exactly one [`ErrorKind`].

pub mod error;
pub mod identity;
pub mod input;
pub mod outcome;
pub mod path;
pub mod policy;
pub mod record;
pub mod trace;

pub use error::{DecisionError, ErrorKind};
pub use identity::{IdentityContext, IdentityType, Subject};
pub use input::EvaluationInput;
pub use outcome::{boolean_fields, resolve_outcome, OutcomeError, OutcomeShape, MAX_OUTCOME_DEPTH};
pub use path::{packages_under, translate, DecisionFilter, PackageDescriptor, PathError, PathSeparator};
pub use policy::{InstanceAddress, PolicyContext};
pub use record::{DecisionLogRecord, DecisionUser};
pub use trace::{ExplainMode, QueryOptions, TraceLevel};
