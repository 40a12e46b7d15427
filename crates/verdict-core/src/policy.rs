//! # Policy Context and Instance Addressing
//!
//! [`PolicyContext`] carries everything a request says about *which* policy
//! to evaluate: the tenant/instance triple, the package path, and the
//! requested decision names. It is built once at the request boundary and
//! passed by reference; the decision tree walk derives per-package copies via
//! [`PolicyContext::with_path`].

use serde::{Deserialize, Serialize};

/// Addressing information for a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyContext {
    /// Tenant or policy instance identifier.
    #[serde(default)]
    pub id: String,
    /// Policy name within the tenant.
    #[serde(default)]
    pub name: String,
    /// Instance label within the tenant.
    #[serde(default)]
    pub instance_label: String,
    /// Package path. Required for Is, may be empty for DecisionTree.
    #[serde(default)]
    pub path: String,
    /// Requested decision names, e.g. `["allowed"]` or `["*"]`.
    #[serde(default)]
    pub decisions: Vec<String>,
}

impl PolicyContext {
    /// Create a context addressing `path` with the given decisions.
    pub fn new(path: impl Into<String>, decisions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            path: path.into(),
            decisions: decisions.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Attach the tenant/instance triple.
    pub fn with_instance(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        instance_label: impl Into<String>,
    ) -> Self {
        self.id = id.into();
        self.name = name.into();
        self.instance_label = instance_label.into();
        self
    }

    /// Derived copy of this context pointing at a different package path.
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..self.clone()
        }
    }

    /// The isolated instance this context addresses, if it addresses one.
    pub fn address(&self) -> Option<InstanceAddress> {
        InstanceAddress::new(&self.id, &self.name, &self.instance_label)
    }
}

/// Key of an isolated policy instance: one compiled rule set and one store.
///
/// Valid only when the tenant id is set together with at least one of the
/// policy name or instance label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceAddress {
    /// Tenant identifier.
    pub tenant_id: String,
    /// Policy name (may be empty when the label is set).
    pub policy_name: String,
    /// Instance label (may be empty when the name is set).
    pub instance_label: String,
}

impl InstanceAddress {
    /// Build an address, returning `None` when the triple is not addressable.
    pub fn new(tenant_id: &str, policy_name: &str, instance_label: &str) -> Option<Self> {
        if tenant_id.is_empty() || (policy_name.is_empty() && instance_label.is_empty()) {
            return None;
        }
        Some(Self {
            tenant_id: tenant_id.to_string(),
            policy_name: policy_name.to_string(),
            instance_label: instance_label.to_string(),
        })
    }
}

impl std::fmt::Display for InstanceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}@{}",
            self.tenant_id, self.policy_name, self.instance_label
        )
    }
}
