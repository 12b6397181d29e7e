//! Run controller.
//!
//! A run threads state through its steps in order: each step's output is the
//! next step's input. Steps therefore execute strictly sequentially. A `Run`
//! owns its state, configuration, and steps outright, so separate runs can
//! live on separate threads without coordination.

use crate::error::{DeterminismError, HashMismatchError, RunError};
use crate::proof::{Proof, ProofBuilder};
use crate::record::{Step, StepRecorder};
use crate::registry::StepRegistry;
use crate::step::ReasoningStep;
use chainproof_core::{Fingerprint, Fingerprinter, RunId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunPhase {
    /// No steps yet
    Empty,
    /// At least one step, no cached proof
    Active,
    /// Proof computed over every recorded step
    Finalized,
}

/// Serializable overview of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// State before the first step
    pub initial_state: Value,
    /// Number of recorded steps
    pub num_steps: usize,
    /// Step fingerprints in order
    pub fingerprints: Vec<Fingerprint>,
    /// Master fingerprint, if finalized
    pub master: Option<Fingerprint>,
}

/// A deterministic chain of reasoning steps
#[derive(Debug, Clone)]
pub struct Run {
    id: RunId,
    initial_state: Value,
    config: Arc<Value>,
    code_version: Arc<str>,
    steps: Vec<Step>,
    final_state: Option<Value>,
    proof: Option<Proof>,
    recorder: StepRecorder,
}

impl Run {
    /// Create an empty run with the default fingerprinter
    #[must_use]
    pub fn new(initial_state: Value, config: Value, code_version: impl Into<String>) -> Self {
        Self::with_fingerprinter(initial_state, config, code_version, Fingerprinter::default())
    }

    /// Create an empty run that fingerprints with `fingerprinter`
    ///
    /// The fingerprinter is fixed for the life of the run, so every stage
    /// hash uses the same algorithm.
    #[must_use]
    pub fn with_fingerprinter(
        initial_state: Value,
        config: Value,
        code_version: impl Into<String>,
        fingerprinter: Fingerprinter,
    ) -> Self {
        let code_version: String = code_version.into();
        Self {
            id: RunId::new(),
            initial_state,
            config: Arc::new(config),
            code_version: Arc::from(code_version),
            steps: Vec::new(),
            final_state: None,
            proof: None,
            recorder: StepRecorder::new(fingerprinter),
        }
    }

    /// Apply a step to the current state and record its fingerprint
    ///
    /// # Errors
    ///
    /// Returns `DeterminismError` if the step fails, panics, or its payload
    /// cannot be encoded. The run is left exactly as it was.
    pub fn add_step<S: ReasoningStep + ?Sized>(
        &mut self,
        step: &S,
    ) -> Result<&mut Self, DeterminismError> {
        let index = self.steps.len();
        let name = step.name();
        let input = self.current_state();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            step.apply(input, &self.config, &self.code_version)
        }));
        let output = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                warn!(run = %self.id, step = name, index, error = %err, "step failed");
                return Err(DeterminismError::StepFailed {
                    name: name.to_string(),
                    index,
                    reason: err.to_string(),
                });
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(run = %self.id, step = name, index, %message, "step panicked");
                return Err(DeterminismError::StepPanicked {
                    name: name.to_string(),
                    index,
                    message,
                });
            }
        };

        let fingerprint = self
            .recorder
            .record(name, input, self.config.as_ref(), &self.code_version)
            .map_err(|source| DeterminismError::Encoding {
                name: name.to_string(),
                source,
            })?;

        debug!(run = %self.id, step = name, index, %fingerprint, "step recorded");
        let record = Step {
            index,
            fn_name: name.to_string(),
            input_state: input.clone(),
            config: Arc::clone(&self.config),
            code_version: Arc::clone(&self.code_version),
            fingerprint,
        };

        self.steps.push(record);
        self.final_state = Some(output);
        self.proof = None;
        Ok(self)
    }

    /// Resolve a step by name and apply it
    ///
    /// # Errors
    ///
    /// Returns `DeterminismError::UnknownStep` if the name is not registered,
    /// otherwise as [`Run::add_step`]
    pub fn add_named_step(
        &mut self,
        registry: &StepRegistry,
        name: &str,
    ) -> Result<&mut Self, DeterminismError> {
        let step = registry.resolve(name)?;
        self.add_step(step.as_ref())
    }

    /// Compute, cache, and return the master proof
    ///
    /// # Errors
    ///
    /// Returns `DeterminismError::EmptyRun` if no step has been added
    pub fn finalize(&mut self) -> Result<Proof, DeterminismError> {
        let proof = self.build_proof()?;
        info!(run = %self.id, steps = proof.len(), master = %proof.master, "run finalized");
        self.proof = Some(proof.clone());
        Ok(proof)
    }

    /// Recompute the proof and compare it with the cached one
    ///
    /// # Errors
    ///
    /// Returns `DeterminismError::NotFinalized` before `finalize`, or
    /// `HashMismatchError` if the recomputed master differs
    pub fn verify(&self) -> Result<(), RunError> {
        let cached = self.proof.as_ref().ok_or(DeterminismError::NotFinalized)?;
        let recomputed = self.build_proof()?;
        if recomputed.master != cached.master {
            return Err(HashMismatchError {
                stored: cached.master.clone(),
                recomputed: recomputed.master,
            }
            .into());
        }
        Ok(())
    }

    fn build_proof(&self) -> Result<Proof, DeterminismError> {
        if self.steps.is_empty() {
            return Err(DeterminismError::EmptyRun);
        }
        let proof = ProofBuilder::new(*self.recorder.fingerprinter()).build(self.stage_hashes())?;
        Ok(proof)
    }

    /// Step fingerprints in order
    #[must_use]
    pub fn stage_hashes(&self) -> Vec<Fingerprint> {
        self.steps.iter().map(|s| s.fingerprint.clone()).collect()
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        if self.proof.is_some() {
            RunPhase::Finalized
        } else if self.steps.is_empty() {
            RunPhase::Empty
        } else {
            RunPhase::Active
        }
    }

    /// Summary for display
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            initial_state: self.initial_state.clone(),
            num_steps: self.steps.len(),
            fingerprints: self.stage_hashes(),
            master: self.proof.as_ref().map(|p| p.master.clone()),
        }
    }

    /// State the next step will receive
    #[must_use]
    pub fn current_state(&self) -> &Value {
        self.final_state.as_ref().unwrap_or(&self.initial_state)
    }

    /// Output of the last step, if any
    #[must_use]
    pub fn final_state(&self) -> Option<&Value> {
        self.final_state.as_ref()
    }

    /// Run identifier used in logs
    #[must_use]
    pub fn id(&self) -> RunId {
        self.id
    }

    /// State before the first step
    #[must_use]
    pub fn initial_state(&self) -> &Value {
        &self.initial_state
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

    /// Recorded steps
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Cached proof, if finalized
    #[must_use]
    pub fn proof(&self) -> Option<&Proof> {
        self.proof.as_ref()
    }

    /// Fingerprinter used by this run
    #[must_use]
    pub fn fingerprinter(&self) -> &Fingerprinter {
        self.recorder.fingerprinter()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{FnStep, StepError};
    use chainproof_core::{DigestAlgorithm, fingerprint};
    use serde_json::json;

    fn add(x: &Value, c: &Value, _v: &str) -> Result<Value, StepError> {
        let x = x.as_i64().ok_or_else(|| StepError::new("state is not an integer"))?;
        let offset = c.get("offset").and_then(Value::as_i64).unwrap_or(0);
        Ok(json!(x + offset))
    }

    fn square(x: &Value, _c: &Value, _v: &str) -> Result<Value, StepError> {
        let x = x.as_i64().ok_or_else(|| StepError::new("state is not an integer"))?;
        Ok(json!(x * x))
    }

    fn divide_by_zero(x: &Value, _c: &Value, _v: &str) -> Result<Value, StepError> {
        let x = x.as_i64().ok_or_else(|| StepError::new("state is not an integer"))?;
        x.checked_div(0)
            .map(|q| json!(q))
            .ok_or_else(|| StepError::new("division by zero"))
    }

    fn scenario_a() -> Run {
        let mut run = Run::new(json!(3), json!({"offset": 2}), "v1.0");
        run.add_step(&FnStep::new("add", add))
            .unwrap()
            .add_step(&FnStep::new("square", square))
            .unwrap();
        run
    }

    #[test]
    fn test_scenario_a_states_and_fingerprints() {
        let mut run = scenario_a();
        assert_eq!(run.final_state(), Some(&json!(25)));
        assert_eq!(run.steps().len(), 2);
        assert_eq!(run.steps()[0].input_state(), &json!(3));
        assert_eq!(run.steps()[1].input_state(), &json!(5));

        let fp1 = fingerprint(&json!({
            "fn": "add", "input": 3, "config": {"offset": 2}, "version": "v1.0"
        }))
        .unwrap();
        let fp2 = fingerprint(&json!({
            "fn": "square", "input": 5, "config": {"offset": 2}, "version": "v1.0"
        }))
        .unwrap();

        let proof = run.finalize().unwrap();
        assert_eq!(proof.stage_hashes, vec![fp1.clone(), fp2.clone()]);
        let concatenated = format!("{fp1}{fp2}");
        assert_eq!(proof.master, fingerprint(concatenated.as_str()).unwrap());
    }

    #[test]
    fn test_scenario_a_reproducible() {
        let a = scenario_a().finalize().unwrap();
        let b = scenario_a().finalize().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_scenario_c_failure_aborts() {
        let mut run = Run::new(json!(3), json!({}), "v1.0");
        run.add_step(&FnStep::new("add", add)).unwrap();

        let err = run
            .add_step(&FnStep::new("divide_by_zero", divide_by_zero))
            .err()
            .unwrap();
        assert_eq!(
            err,
            DeterminismError::StepFailed {
                name: "divide_by_zero".to_string(),
                index: 1,
                reason: "division by zero".to_string(),
            }
        );
        // Nothing from the failed step is kept.
        assert_eq!(run.steps().len(), 1);
        assert_eq!(run.final_state(), Some(&json!(3)));
    }

    #[test]
    fn test_panicking_step() {
        let mut run = Run::new(json!(1), json!({}), "v1.0");
        let step = FnStep::new("explode", |_: &Value, _: &Value, _: &str| -> Result<Value, StepError> {
            panic!("kaboom")
        });
        let err = run.add_step(&step).err().unwrap();
        assert_eq!(
            err,
            DeterminismError::StepPanicked {
                name: "explode".to_string(),
                index: 0,
                message: "kaboom".to_string(),
            }
        );
        assert_eq!(run.phase(), RunPhase::Empty);
    }

    #[test]
    fn test_empty_run_rejected() {
        let mut run = Run::new(json!(0), json!({}), "v1.0");
        assert_eq!(run.finalize().unwrap_err(), DeterminismError::EmptyRun);
        assert!(run.proof().is_none());
    }

    #[test]
    fn test_finalize_idempotent() {
        let mut run = scenario_a();
        let first = run.finalize().unwrap();
        let second = run.finalize().unwrap();
        assert_eq!(first, second);
        assert_eq!(run.proof(), Some(&first));
    }

    #[test]
    fn test_phase_transitions() {
        let mut run = Run::new(json!(3), json!({"offset": 2}), "v1.0");
        assert_eq!(run.phase(), RunPhase::Empty);

        run.add_step(&FnStep::new("add", add)).unwrap();
        assert_eq!(run.phase(), RunPhase::Active);

        run.finalize().unwrap();
        assert_eq!(run.phase(), RunPhase::Finalized);

        run.add_step(&FnStep::new("square", square)).unwrap();
        assert_eq!(run.phase(), RunPhase::Active);
        assert!(run.proof().is_none());

        let proof = run.finalize().unwrap();
        assert_eq!(proof.len(), 2);
    }

    #[test]
    fn test_verify_cached_proof() {
        let mut run = scenario_a();
        assert_eq!(
            run.verify().unwrap_err(),
            RunError::Determinism(DeterminismError::NotFinalized)
        );
        run.finalize().unwrap();
        assert!(run.verify().is_ok());
    }

    #[test]
    fn test_named_steps() {
        let mut registry = StepRegistry::new();
        registry.register_fn("add", add).unwrap();
        registry.register_fn("square", square).unwrap();

        let mut run = Run::new(json!(3), json!({"offset": 2}), "v1.0");
        run.add_named_step(&registry, "add")
            .unwrap()
            .add_named_step(&registry, "square")
            .unwrap();
        assert_eq!(run.finalize().unwrap(), scenario_a().finalize().unwrap());

        let err = run.add_named_step(&registry, "cube").err().unwrap();
        assert_eq!(err, DeterminismError::UnknownStep { name: "cube".to_string() });
    }

    #[test]
    fn test_step_order_changes_master() {
        let mut forward = Run::new(json!(3), json!({"offset": 2}), "v1.0");
        forward
            .add_step(&FnStep::new("add", add))
            .unwrap()
            .add_step(&FnStep::new("square", square))
            .unwrap();

        let mut reversed = Run::new(json!(3), json!({"offset": 2}), "v1.0");
        reversed
            .add_step(&FnStep::new("square", square))
            .unwrap()
            .add_step(&FnStep::new("add", add))
            .unwrap();

        assert_ne!(forward.finalize().unwrap().master, reversed.finalize().unwrap().master);
    }

    #[test]
    fn test_version_changes_master() {
        let mut v1 = Run::new(json!(3), json!({}), "v1.0");
        v1.add_step(&FnStep::new("square", square)).unwrap();
        let mut v2 = Run::new(json!(3), json!({}), "v1.1");
        v2.add_step(&FnStep::new("square", square)).unwrap();
        assert_ne!(v1.finalize().unwrap().master, v2.finalize().unwrap().master);
    }

    #[test]
    fn test_fingerprinter_override() {
        let mut run = Run::with_fingerprinter(
            json!(3),
            json!({}),
            "v1.0",
            Fingerprinter::new(DigestAlgorithm::Blake3),
        );
        run.add_step(&FnStep::new("square", square)).unwrap();
        let blake = run.finalize().unwrap();

        let mut default = Run::new(json!(3), json!({}), "v1.0");
        default.add_step(&FnStep::new("square", square)).unwrap();
        assert_ne!(blake.master, default.finalize().unwrap().master);
        assert_eq!(run.fingerprinter().algorithm, DigestAlgorithm::Blake3);
    }

    #[test]
    fn test_fingerprinter_fixed_for_every_stage() {
        let blake = Fingerprinter::new(DigestAlgorithm::Blake3);
        let mut run = Run::with_fingerprinter(json!(3), json!({"offset": 2}), "v1.0", blake);
        run.add_step(&FnStep::new("add", add))
            .unwrap()
            .add_step(&FnStep::new("square", square))
            .unwrap();

        let recorder = StepRecorder::new(blake);
        for step in run.steps() {
            let expected = recorder
                .record(step.fn_name(), step.input_state(), step.config(), step.code_version())
                .unwrap();
            assert_eq!(step.fingerprint(), &expected);
        }
        let proof = run.finalize().unwrap();
        assert!(proof.check_integrity(&blake).is_ok());
        assert!(proof.check_integrity(&Fingerprinter::default()).is_err());
    }

    #[test]
    fn test_summary() {
        let mut run = scenario_a();
        let before = run.summary();
        assert_eq!(before.num_steps, 2);
        assert!(before.master.is_none());

        let proof = run.finalize().unwrap();
        let after = run.summary();
        assert_eq!(after.master, Some(proof.master));
        assert_eq!(after.fingerprints, proof.stage_hashes);
        assert_eq!(after.initial_state, json!(3));
    }

    #[test]
    fn test_runs_on_separate_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| scenario_a().finalize().unwrap()))
            .collect();
        let proofs: Vec<Proof> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(proofs.windows(2).all(|w| w[0] == w[1]));
    }
}
