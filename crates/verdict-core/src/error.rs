//! # Error Hierarchy
//!
//! Structured error types for the decision engine, built with `thiserror`.
//!
//! Every failure surfaced by an authorization operation is a
//! [`DecisionError`], and every `DecisionError` maps to exactly one
//! [`ErrorKind`]. Transport layers translate the kind into a status code;
//! they never inspect message text.

use thiserror::Error;
use uuid::Uuid;

use crate::outcome::OutcomeError;

/// Externally observable classification of a [`DecisionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing request fields. Caller error, never retried.
    InvalidArgument,
    /// The identity was well-formed but did not resolve to a subject.
    AuthenticationFailed,
    /// Evaluation preparation or runtime failure, or an undefined result.
    BadQuery,
    /// A requested decision was absent or had an unusable shape.
    InvalidDecision,
    /// The addressed policy instance could not be procured.
    InstanceUnavailable,
    /// The decision log sink rejected a record.
    DecisionLog,
    /// The caller cancelled the request.
    Cancelled,
    /// The request deadline elapsed before completion.
    DeadlineExceeded,
    /// Unexpected internal failure.
    Internal,
}

impl ErrorKind {
    /// Return the machine-readable code for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::BadQuery => "BAD_QUERY",
            Self::InvalidDecision => "INVALID_DECISION",
            Self::InstanceUnavailable => "INSTANCE_UNAVAILABLE",
            Self::DecisionLog => "DECISION_LOG_FAILED",
            Self::Cancelled => "CANCELLED",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a DecisionTree, Is, Query, or Compile operation.
#[derive(Error, Debug)]
pub enum DecisionError {
    /// A request field is missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The identity context did not resolve to a subject.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Evaluation failed or produced no bindings.
    #[error("bad query [{query}]: {reason}")]
    BadQuery {
        /// The evaluated expression.
        query: String,
        /// Why evaluation failed.
        reason: String,
    },

    /// A requested decision could not be resolved to a boolean.
    #[error("failed getting outcome for decision [{decision}]: {source}")]
    InvalidDecision {
        /// The decision name being resolved.
        decision: String,
        /// What was wrong with the rule result.
        #[source]
        source: OutcomeError,
    },

    /// No policy instance is registered under the requested address.
    #[error("failed to procure policy instance {address}: not found")]
    UnknownInstance {
        /// The `tenant/name@label` addressing triple.
        address: String,
    },

    /// The policy instance exists but could not be reached.
    #[error("failed to procure policy instance {address}: {reason}")]
    InstanceUnavailable {
        /// The `tenant/name@label` addressing triple.
        address: String,
        /// Collaborator failure description.
        reason: String,
    },

    /// The decision log sink failed after decisions were computed.
    #[error("failed to log decision {record_id}: {reason}")]
    DecisionLog {
        /// Identifier of the record that could not be emitted.
        record_id: Uuid,
        /// Sink failure description.
        reason: String,
    },

    /// The request was cancelled before completion.
    #[error("request cancelled")]
    Cancelled,

    /// The request deadline elapsed.
    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// Unexpected internal failure (serialization, invariant breach).
    #[error("internal error: {0}")]
    Internal(String),
}

impl DecisionError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::AuthenticationFailed(_) => ErrorKind::AuthenticationFailed,
            Self::BadQuery { .. } => ErrorKind::BadQuery,
            Self::InvalidDecision { .. } => ErrorKind::InvalidDecision,
            Self::UnknownInstance { .. } | Self::InstanceUnavailable { .. } => {
                ErrorKind::InstanceUnavailable
            }
            Self::DecisionLog { .. } => ErrorKind::DecisionLog,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for [`DecisionError::InvalidArgument`].
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Shorthand for [`DecisionError::BadQuery`].
    pub fn bad_query(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BadQuery {
            query: query.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for DecisionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_cover_every_variant() {
        let cases = [
            (DecisionError::invalid_argument("x"), ErrorKind::InvalidArgument),
            (
                DecisionError::AuthenticationFailed("x".into()),
                ErrorKind::AuthenticationFailed,
            ),
            (DecisionError::bad_query("x = data.a", "undefined"), ErrorKind::BadQuery),
            (
                DecisionError::InvalidDecision {
                    decision: "allowed".into(),
                    source: OutcomeError::Missing("allowed".into()),
                },
                ErrorKind::InvalidDecision,
            ),
            (
                DecisionError::UnknownInstance { address: "t/p@l".into() },
                ErrorKind::InstanceUnavailable,
            ),
            (
                DecisionError::InstanceUnavailable {
                    address: "t/p@l".into(),
                    reason: "refused".into(),
                },
                ErrorKind::InstanceUnavailable,
            ),
            (
                DecisionError::DecisionLog {
                    record_id: Uuid::nil(),
                    reason: "disk full".into(),
                },
                ErrorKind::DecisionLog,
            ),
            (DecisionError::Cancelled, ErrorKind::Cancelled),
            (DecisionError::DeadlineExceeded, ErrorKind::DeadlineExceeded),
            (DecisionError::Internal("x".into()), ErrorKind::Internal),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "{err}");
        }
    }

    #[test]
    fn bad_query_message_carries_expression() {
        let err = DecisionError::bad_query("x = data.app.GET", "undefined results");
        let msg = err.to_string();
        assert!(msg.contains("x = data.app.GET"));
        assert!(msg.contains("undefined results"));
    }

    #[test]
    fn invalid_decision_message_names_decision() {
        let err = DecisionError::InvalidDecision {
            decision: "visible".into(),
            source: OutcomeError::Missing("visible".into()),
        };
        assert!(err.to_string().contains("[visible]"));
    }

    #[test]
    fn kind_codes_are_stable() {
        assert_eq!(ErrorKind::InvalidArgument.to_string(), "INVALID_ARGUMENT");
        assert_eq!(ErrorKind::AuthenticationFailed.as_str(), "AUTHENTICATION_FAILED");
        assert_eq!(ErrorKind::DecisionLog.as_str(), "DECISION_LOG_FAILED");
    }
}
