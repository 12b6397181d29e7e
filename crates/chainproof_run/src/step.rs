//! The reasoning step trait.

use serde_json::Value;
use std::sync::Arc;

/// Failure reported by a step
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StepError {
    message: String,
}

impl StepError {
    /// Create a new step error
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Get the error message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One deterministic transformation in a run.
///
/// `apply` receives the previous state, the run configuration, and the code
/// version, and returns the next state. Implementations must not rely on
/// anything else if their runs are to replay.
pub trait ReasoningStep: Send + Sync {
    /// Stable identifier; part of every fingerprint this step produces
    fn name(&self) -> &str;

    /// Compute the next state
    ///
    /// # Errors
    ///
    /// Returns error if the step cannot produce a state
    fn apply(&self, state: &Value, config: &Value, version: &str) -> Result<Value, StepError>;
}

impl<T: ReasoningStep + ?Sized> ReasoningStep for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn apply(&self, state: &Value, config: &Value, version: &str) -> Result<Value, StepError> {
        (**self).apply(state, config, version)
    }
}

impl<T: ReasoningStep + ?Sized> ReasoningStep for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn apply(&self, state: &Value, config: &Value, version: &str) -> Result<Value, StepError> {
        (**self).apply(state, config, version)
    }
}

/// A step backed by a function or closure
pub struct FnStep<F> {
    name: String,
    f: F,
}

impl<F> FnStep<F>
where
    F: Fn(&Value, &Value, &str) -> Result<Value, StepError> + Send + Sync,
{
    /// Create a named function step
    #[must_use]
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> ReasoningStep for FnStep<F>
where
    F: Fn(&Value, &Value, &str) -> Result<Value, StepError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, state: &Value, config: &Value, version: &str) -> Result<Value, StepError> {
        (self.f)(state, config, version)
    }
}

impl<F> std::fmt::Debug for FnStep<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep").field("name", &self.name).finish_non_exhaustive()
    }
}
