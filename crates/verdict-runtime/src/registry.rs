//! # Policy Instance Registry
//!
//! Maps [`InstanceAddress`] to a shared [`PolicyRuntime`]. Lookups of
//! different addresses never contend on a common lock: the map is a
//! `DashMap`, and the [`RuntimeFactory`] runs with no shard locked. When two
//! requests race to create the same address, the first insert wins and both
//! share that runtime.
//!
//! Requests without an addressable policy context resolve to the single
//! process-wide default instance.

use std::sync::Arc;

use dashmap::DashMap;
use verdict_core::InstanceAddress;

use crate::error::RuntimeError;
use crate::PolicyRuntime;

/// Creates runtimes for addresses the registry has not seen yet.
pub trait RuntimeFactory: Send + Sync {
    /// Build the runtime for `address`, or report it unknown.
    fn create(&self, address: &InstanceAddress) -> Result<Arc<dyn PolicyRuntime>, RuntimeError>;
}

/// Concurrent keyed registry of policy instances.
#[derive(Default)]
pub struct InstanceRegistry {
    instances: DashMap<InstanceAddress, Arc<dyn PolicyRuntime>>,
    default_instance: Option<Arc<dyn PolicyRuntime>>,
    factory: Option<Arc<dyn RuntimeFactory>>,
}

impl std::fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("instances", &self.instances.len())
            .field("has_default", &self.default_instance.is_some())
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

impl InstanceRegistry {
    /// An empty registry with no default instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default instance.
    pub fn with_default(mut self, runtime: Arc<dyn PolicyRuntime>) -> Self {
        self.default_instance = Some(runtime);
        self
    }

    /// Set the factory used for unregistered addresses.
    pub fn with_factory(mut self, factory: Arc<dyn RuntimeFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Register or replace the runtime for `address`.
    pub fn register(&self, address: InstanceAddress, runtime: Arc<dyn PolicyRuntime>) {
        tracing::info!(instance = %address, "registered policy instance");
        self.instances.insert(address, runtime);
    }

    /// Number of registered (non-default) instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether no addressed instances are registered.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Whether a default instance is configured.
    pub fn has_default(&self) -> bool {
        self.default_instance.is_some()
    }

    /// The runtime registered for `address`, creating it through the
    /// factory when absent.
    pub fn get(&self, address: &InstanceAddress) -> Result<Arc<dyn PolicyRuntime>, RuntimeError> {
        if let Some(rt) = self.instances.get(address) {
            return Ok(Arc::clone(rt.value()));
        }

        let factory = self
            .factory
            .as_ref()
            .ok_or_else(|| RuntimeError::InstanceNotFound(address.to_string()))?;

        tracing::debug!(instance = %address, "creating policy instance");
        let created = factory.create(address)?;
        let entry = self.instances.entry(address.clone()).or_insert(created);
        Ok(Arc::clone(entry.value()))
    }

    /// The default instance.
    pub fn default_instance(&self) -> Result<Arc<dyn PolicyRuntime>, RuntimeError> {
        self.default_instance
            .clone()
            .ok_or(RuntimeError::NoDefaultInstance)
    }

    /// The addressed instance, or the default when `address` is `None`.
    pub fn select(
        &self,
        address: Option<&InstanceAddress>,
    ) -> Result<Arc<dyn PolicyRuntime>, RuntimeError> {
        match address {
            Some(address) => self.get(address),
            None => self.default_instance(),
        }
    }
}
