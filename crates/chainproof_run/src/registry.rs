//! Typed step registry.
//!
//! Replay resolves step names through a registry built at startup, never
//! through reflective loading.

use crate::error::DeterminismError;
use crate::step::{FnStep, ReasoningStep, StepError};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Error from registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A step is already registered under this name
    #[error("step already registered: {name}")]
    AlreadyRegistered {
        /// Conflicting name
        name: String,
    },
    /// Step names must be non-empty
    #[error("step name must not be empty")]
    EmptyName,
}

/// Registry of steps by stable name, in registration order
#[derive(Clone, Default)]
pub struct StepRegistry {
    steps: IndexMap<String, Arc<dyn ReasoningStep>>,
}

impl StepRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: IndexMap::new(),
        }
    }

    /// Register a step under its own name
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or already taken
    pub fn register<S: ReasoningStep + 'static>(&mut self, step: S) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(step))
    }

    /// Register a shared step
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or already taken
    pub fn register_arc(&mut self, step: Arc<dyn ReasoningStep>) -> Result<(), RegistryError> {
        let name = step.name().to_string();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.steps.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered { name });
        }
        self.steps.insert(name, step);
        Ok(())
    }

    /// Register a function under `name`
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or already taken
    pub fn register_fn<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: Fn(&Value, &Value, &str) -> Result<Value, StepError> + Send + Sync + 'static,
    {
        self.register(FnStep::new(name, f))
    }

    /// Resolve a step by name
    ///
    /// # Errors
    ///
    /// Returns `DeterminismError::UnknownStep` if nothing is registered under `name`
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ReasoningStep>, DeterminismError> {
        self.steps
            .get(name)
            .map(Arc::clone)
            .ok_or_else(|| DeterminismError::UnknownStep {
                name: name.to_string(),
            })
    }

    /// Resolve a sequence of names, preserving order
    ///
    /// # Errors
    ///
    /// Returns the first unknown name
    pub fn resolve_all<N: AsRef<str>>(
        &self,
        names: &[N],
    ) -> Result<Vec<Arc<dyn ReasoningStep>>, DeterminismError> {
        names.iter().map(|n| self.resolve(n.as_ref())).collect()
    }

    /// Check whether a name is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    /// Registered names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    /// Number of registered steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.steps.keys()).finish()
    }
}
