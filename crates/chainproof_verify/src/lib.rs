//! chainproof verification
//!
//! Replays a recorded chain and compares the result with a stored proof.
//! Stage hash divergence under a matching master is reported separately.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diff;
pub mod verifier;

pub use diff::{StageAnomaly, stage_diff};
pub use verifier::{VerifyConfig, VerifyError, VerifyReport, Verifier, load_proof, verify_proof_file};
