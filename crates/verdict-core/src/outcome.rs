//! # Decision Outcome Extraction
//!
//! A rule result for a decision may be a plain boolean or a mapping that
//! contains the decision's own name again, e.g. `{"allowed": {"allowed":
//! true}}`. [`resolve_outcome`] unwraps that shape iteratively and gives up
//! after [`MAX_OUTCOME_DEPTH`] levels.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

/// Maximum number of mapping levels [`resolve_outcome`] will descend.
pub const MAX_OUTCOME_DEPTH: usize = 32;

/// Why a decision could not be resolved to a boolean.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutcomeError {
    /// The decision key was absent from a mapping.
    #[error("decision {0:?} not found in result")]
    Missing(String),

    /// The value was neither a boolean nor a mapping.
    #[error("unexpected result shape: {found}")]
    UnexpectedShape {
        /// JSON type name of the offending value.
        found: &'static str,
    },

    /// Nesting exceeded [`MAX_OUTCOME_DEPTH`].
    #[error("result nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Classification of a rule result value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutcomeShape<'a> {
    /// A plain boolean outcome.
    Bool(bool),
    /// A mapping to search for the decision name.
    Mapping(&'a Map<String, Value>),
    /// Anything else, named by JSON type.
    Other(&'static str),
}

impl<'a> OutcomeShape<'a> {
    /// Classify `value`.
    pub fn of(value: &'a Value) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(*b),
            Value::Object(map) => Self::Mapping(map),
            Value::Null => Self::Other("null"),
            Value::Number(_) => Self::Other("number"),
            Value::String(_) => Self::Other("string"),
            Value::Array(_) => Self::Other("array"),
        }
    }
}

/// Resolve the boolean outcome of `decision` from a rule result.
pub fn resolve_outcome(value: &Value, decision: &str) -> Result<bool, OutcomeError> {
    let mut current = value;
    for _ in 0..=MAX_OUTCOME_DEPTH {
        match OutcomeShape::of(current) {
            OutcomeShape::Bool(b) => return Ok(b),
            OutcomeShape::Mapping(map) => {
                current = map
                    .get(decision)
                    .ok_or_else(|| OutcomeError::Missing(decision.to_string()))?;
            }
            OutcomeShape::Other(found) => return Err(OutcomeError::UnexpectedShape { found }),
        }
    }
    Err(OutcomeError::TooDeep(MAX_OUTCOME_DEPTH))
}

/// The top-level boolean fields of a rule result. Everything else is dropped.
pub fn boolean_fields(value: &Value) -> BTreeMap<String, bool> {
    match value {
        Value::Object(map) => map
            .iter()
            .filter_map(|(k, v)| v.as_bool().map(|b| (k.clone(), b)))
            .collect(),
        _ => BTreeMap::new(),
    }
}
