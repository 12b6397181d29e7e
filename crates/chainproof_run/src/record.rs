//! Step records and the step recorder.
//!
//! The recorder only fingerprints. Executing the step is the run's job, so
//! a failing step never reaches the hashing path.

use chainproof_core::{CoreResult, Fingerprint, Fingerprinter};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Canonical payload of one step: `{fn, input, config, version}`
#[derive(Serialize)]
struct StepPayload<'a, S: ?Sized, C: ?Sized> {
    #[serde(rename = "fn")]
    function: &'a str,
    input: &'a S,
    config: &'a C,
    version: &'a str,
}

/// Fingerprints step invocations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepRecorder {
    fingerprinter: Fingerprinter,
}

impl StepRecorder {
    /// Create a recorder using the given fingerprinter
    #[must_use]
    pub fn new(fingerprinter: Fingerprinter) -> Self {
        Self { fingerprinter }
    }

    /// Get the fingerprinter
    #[must_use]
    pub fn fingerprinter(&self) -> &Fingerprinter {
        &self.fingerprinter
    }

    /// Fingerprint a step invocation
    ///
    /// # Errors
    ///
    /// Returns error if the input state or config cannot be canonically encoded
    pub fn record<S, C>(
        &self,
        function_name: &str,
        input_state: &S,
        config: &C,
        code_version: &str,
    ) -> CoreResult<Fingerprint>
    where
        S: Serialize + ?Sized,
        C: Serialize + ?Sized,
    {
        self.fingerprinter.fingerprint(&StepPayload {
            function: function_name,
            input: input_state,
            config,
            version: code_version,
        })
    }
}

/// One recorded step of a run
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub(crate) index: usize,
    pub(crate) fn_name: String,
    pub(crate) input_state: Value,
    pub(crate) config: Arc<Value>,
    pub(crate) code_version: Arc<str>,
    pub(crate) fingerprint: Fingerprint,
}

impl Step {
    /// Position in the run
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Step name
    #[must_use]
    pub fn fn_name(&self) -> &str {
        &self.fn_name
    }

    /// State the step was applied to
    #[must_use]
    pub fn input_state(&self) -> &Value {
        &self.input_state
    }

    /// Run configuration
    #[must_use]
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Code version tag
    #[must_use]
    pub fn code_version(&self) -> &str {
        &self.code_version
    }

    /// Fingerprint of this step
    #[must_use]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainproof_core::DigestAlgorithm;
    use serde_json::json;

    #[test]
    fn test_record_matches_explicit_payload() {
        let recorder = StepRecorder::default();
        let fp = recorder.record("add", &json!(3), &json!({"offset": 2}), "v1.0").unwrap();

        let explicit = json!({
            "fn": "add",
            "input": 3,
            "config": {"offset": 2},
            "version": "v1.0",
        });
        assert_eq!(fp, chainproof_core::fingerprint(&explicit).unwrap());
    }

    #[test]
    fn test_every_field_contributes() {
        let recorder = StepRecorder::default();
        let base = recorder.record("add", &json!(3), &json!({"offset": 2}), "v1.0").unwrap();

        let variants = [
            recorder.record("sub", &json!(3), &json!({"offset": 2}), "v1.0").unwrap(),
            recorder.record("add", &json!(4), &json!({"offset": 2}), "v1.0").unwrap(),
            recorder.record("add", &json!(3), &json!({"offset": 3}), "v1.0").unwrap(),
            recorder.record("add", &json!(3), &json!({"offset": 2}), "v1.1").unwrap(),
            recorder.record("add", &json!("3"), &json!({"offset": 2}), "v1.0").unwrap(),
        ];
        for v in &variants {
            assert_ne!(&base, v);
        }
    }

    #[test]
    fn test_config_key_order_irrelevant() {
        let recorder = StepRecorder::default();
        let a: Value = serde_json::from_str(r#"{"offset": 2, "mode": "fast"}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"mode": "fast", "offset": 2}"#).unwrap();
        assert_eq!(
            recorder.record("add", &json!(3), &a, "v1").unwrap(),
            recorder.record("add", &json!(3), &b, "v1").unwrap()
        );
    }

    #[test]
    fn test_typed_inputs() {
        #[derive(Serialize)]
        struct Params {
            offset: i64,
        }
        let recorder = StepRecorder::new(Fingerprinter::new(DigestAlgorithm::Blake3));
        let typed = recorder.record("add", &3u32, &Params { offset: 2 }, "v1").unwrap();
        let untyped = recorder.record("add", &json!(3), &json!({"offset": 2}), "v1").unwrap();
        assert_eq!(typed, untyped);
    }
}
