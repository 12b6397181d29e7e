//! chainproof run control
//!
//! Recording of reasoning steps, the run lifecycle, and master proof
//! construction.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod proof;
pub mod record;
pub mod registry;
pub mod run;
pub mod step;

pub use error::{DeterminismError, HashMismatchError, ProofError, RunError};
pub use proof::{Proof, ProofBuilder};
pub use record::{Step, StepRecorder};
pub use registry::{RegistryError, StepRegistry};
pub use run::{Run, RunPhase, RunSummary};
pub use step::{FnStep, ReasoningStep, StepError};
