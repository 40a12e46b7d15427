//! # Decision Log Record
//!
//! One audit entry per Is call. The record is fully owned so concurrent Is
//! calls never share one; sinks receive it by reference and must not retain
//! it beyond the call unless they copy it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::identity::IdentityContext;
use crate::policy::PolicyContext;

/// Who the decision was made for.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionUser {
    /// The caller's identity claim.
    pub context: IdentityContext,
    /// Resolved subject id, empty when not resolvable.
    #[serde(default)]
    pub id: String,
    /// Resolved subject email, empty when not resolvable.
    #[serde(default)]
    pub email: String,
}

/// Audit entry for a single Is call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLogRecord {
    /// Fresh unique identifier.
    pub id: Uuid,
    /// UTC time the record was created.
    pub timestamp: DateTime<Utc>,
    /// Evaluated package path.
    pub path: String,
    /// Policy addressing of the call.
    pub policy: PolicyContext,
    /// Subject the decision applies to.
    pub user: DecisionUser,
    /// Resource attributes supplied with the call.
    pub resource: Map<String, Value>,
    /// Exactly the requested decisions and their outcomes.
    pub outcomes: BTreeMap<String, bool>,
}

impl DecisionLogRecord {
    /// Build a record stamped with a fresh id and the current UTC time.
    pub fn new(
        policy: PolicyContext,
        user: DecisionUser,
        resource: Map<String, Value>,
        outcomes: BTreeMap<String, bool>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            path: policy.path.clone(),
            policy,
            user,
            resource,
            outcomes,
        }
    }
}
