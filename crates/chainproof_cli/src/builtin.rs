//! Built-in step catalog.
//!
//! Integer arithmetic over a JSON number state. Overflow is a step failure,
//! not a panic.

use chainproof_run::{RegistryError, StepError, StepRegistry};
use serde_json::Value;

fn int(state: &Value) -> Result<i64, StepError> {
    state
        .as_i64()
        .ok_or_else(|| StepError::new(format!("state must be an integer, got {state}")))
}

fn config_int(config: &Value, key: &str) -> Result<Option<i64>, StepError> {
    match config.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| StepError::new(format!("config.{key} must be an integer, got {v}"))),
    }
}

fn overflow() -> StepError {
    StepError::new("integer overflow")
}

/// `state + config.offset` (offset defaults to 0)
pub fn add_offset(state: &Value, config: &Value, _version: &str) -> Result<Value, StepError> {
    let offset = config_int(config, "offset")?.unwrap_or(0);
    int(state)?
        .checked_add(offset)
        .map(Value::from)
        .ok_or_else(overflow)
}

/// `state * state`
pub fn square(state: &Value, _config: &Value, _version: &str) -> Result<Value, StepError> {
    let x = int(state)?;
    x.checked_mul(x).map(Value::from).ok_or_else(overflow)
}

/// `2 * state`
pub fn double(state: &Value, _config: &Value, _version: &str) -> Result<Value, StepError> {
    int(state)?.checked_mul(2).map(Value::from).ok_or_else(overflow)
}

/// `-state`
pub fn negate(state: &Value, _config: &Value, _version: &str) -> Result<Value, StepError> {
    int(state)?.checked_neg().map(Value::from).ok_or_else(overflow)
}

/// Returns the state unchanged; accepts any JSON
pub fn identity(state: &Value, _config: &Value, _version: &str) -> Result<Value, StepError> {
    Ok(state.clone())
}

/// `state / config.divisor`, truncating
pub fn divide_by(state: &Value, config: &Value, _version: &str) -> Result<Value, StepError> {
    let divisor = config_int(config, "divisor")?
        .ok_or_else(|| StepError::new("config.divisor is required"))?;
    if divisor == 0 {
        return Err(StepError::new("division by zero"));
    }
    int(state)?
        .checked_div(divisor)
        .map(Value::from)
        .ok_or_else(overflow)
}

/// Registry of every built-in step
///
/// # Errors
///
/// Returns error if two built-ins share a name
pub fn registry() -> Result<StepRegistry, RegistryError> {
    let mut registry = StepRegistry::new();
    registry.register_fn("add_offset", add_offset)?;
    registry.register_fn("square", square)?;
    registry.register_fn("double", double)?;
    registry.register_fn("negate", negate)?;
    registry.register_fn("identity", identity)?;
    registry.register_fn("divide_by", divide_by)?;
    Ok(registry)
}
