//! # Identity Context and Subject
//!
//! An [`IdentityContext`] is the caller's claim: a raw identity string tagged
//! with an [`IdentityType`]. A [`Subject`] is the canonical user record the
//! claim resolves to through the directory.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of identity claim carried by an [`IdentityContext`].
///
/// Serializes with the `IDENTITY_TYPE_*` names that policies match against.
/// Short lowercase aliases are accepted on input; anything unrecognized
/// deserializes to [`IdentityType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IdentityType {
    /// Anonymous caller. Resolves to an empty subject without a lookup.
    #[serde(rename = "IDENTITY_TYPE_NONE", alias = "none")]
    None,
    /// Subject identifier (user name, email, or other directory key).
    #[serde(rename = "IDENTITY_TYPE_SUB", alias = "sub")]
    Sub,
    /// Bearer JWT whose subject is looked up in the directory.
    #[serde(rename = "IDENTITY_TYPE_JWT", alias = "jwt")]
    Jwt,
    /// Identity supplied verbatim by a trusted caller.
    #[serde(rename = "IDENTITY_TYPE_MANUAL", alias = "manual")]
    Manual,
    /// Unset or unrecognized. Rejected by every authorizing operation.
    #[default]
    #[serde(rename = "IDENTITY_TYPE_UNKNOWN", alias = "unknown", other)]
    Unknown,
}

impl IdentityType {
    /// Return the wire name of this identity type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "IDENTITY_TYPE_UNKNOWN",
            Self::None => "IDENTITY_TYPE_NONE",
            Self::Sub => "IDENTITY_TYPE_SUB",
            Self::Jwt => "IDENTITY_TYPE_JWT",
            Self::Manual => "IDENTITY_TYPE_MANUAL",
        }
    }
}

impl std::fmt::Display for IdentityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller's claimed identity. Immutable for the lifetime of a request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdentityContext {
    /// Raw identity string as supplied by the caller.
    #[serde(default)]
    pub identity: String,
    /// How `identity` should be interpreted.
    #[serde(rename = "type", default)]
    pub identity_type: IdentityType,
}

impl IdentityContext {
    /// Create an identity context.
    pub fn new(identity_type: IdentityType, identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            identity_type,
        }
    }

    /// An anonymous identity context.
    pub fn anonymous() -> Self {
        Self::new(IdentityType::None, "")
    }
}

/// Canonical identity record resolved from an [`IdentityContext`].
///
/// Serialized verbatim as `input.user` for policy evaluation. Produced per
/// request and never persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Subject {
    /// Directory identifier of the subject.
    #[serde(default)]
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: String,
    /// Primary email, when the directory record carries one.
    #[serde(default)]
    pub email: String,
    /// Arbitrary directory attributes.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Subject {
    /// The empty subject used for anonymous callers.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Email of the subject, falling back to `properties.email`.
    pub fn email(&self) -> Option<&str> {
        if !self.email.is_empty() {
            return Some(&self.email);
        }
        self.properties
            .get("email")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
    }
}
