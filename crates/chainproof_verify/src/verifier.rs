//! Replay verification.
//!
//! A stored proof is trusted only if replaying the same steps from the same
//! initial state, configuration, and code version reproduces its master.

use crate::diff::{StageAnomaly, stage_diff};
use chainproof_core::{Fingerprint, Fingerprinter};
use chainproof_run::{DeterminismError, HashMismatchError, Proof, ReasoningStep, Run};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Verifier configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Fail on stage hash divergence even when the master matches
    pub strict_stages: bool,
    /// Fingerprinter used for the replay
    pub fingerprinter: Fingerprinter,
}

/// Verification error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Replayed master differs from the stored one
    #[error(transparent)]
    HashMismatch(#[from] HashMismatchError),

    /// Stage hashes differ while the master matches (strict mode only)
    #[error("stage hash anomaly: {0}")]
    StageAnomaly(StageAnomaly),

    /// Replay itself failed
    #[error("replay failed: {0}")]
    Determinism(#[from] DeterminismError),

    /// Proof file does not exist
    #[error("proof file not found: {}", path.display())]
    ProofNotFound {
        /// Requested path
        path: PathBuf,
    },

    /// Proof file could not be parsed
    #[error("malformed proof file {}: {reason}", path.display())]
    Malformed {
        /// File path
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Proof file could not be read
    #[error("cannot read proof file {}: {reason}", path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// OS error message
        reason: String,
    },
}

/// Outcome of a successful verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Master reproduced by the replay
    pub master: Fingerprint,
    /// Stage hashes reproduced by the replay
    pub stage_hashes: Vec<Fingerprint>,
    /// Stage divergence tolerated in non-strict mode
    pub anomaly: Option<StageAnomaly>,
}

impl VerifyReport {
    /// Number of replayed steps
    #[must_use]
    pub fn num_steps(&self) -> usize {
        self.stage_hashes.len()
    }

    /// Whether the stored stage hashes matched as well as the master
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.anomaly.is_none()
    }
}

/// Replays runs and checks them against stored proofs
#[derive(Debug, Clone, Copy, Default)]
pub struct Verifier {
    config: VerifyConfig,
}

impl Verifier {
    /// Create a verifier
    #[must_use]
    pub fn new(config: VerifyConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// Replay `steps` and compare against `stored`
    ///
    /// # Errors
    ///
    /// Returns `VerifyError::HashMismatch` if the replayed master differs,
    /// `VerifyError::Determinism` if the replay fails, and
    /// `VerifyError::StageAnomaly` for stage divergence in strict mode
    pub fn verify<S: ReasoningStep>(
        &self,
        stored: &Proof,
        initial_state: Value,
        config: Value,
        code_version: &str,
        steps: &[S],
    ) -> Result<VerifyReport, VerifyError> {
        let mut run =
            Run::with_fingerprinter(initial_state, config, code_version, self.config.fingerprinter);
        for step in steps {
            run.add_step(step)?;
        }
        let recomputed = run.finalize()?;

        if recomputed.master != stored.master {
            warn!(run = %run.id(), stored = %stored.master, recomputed = %recomputed.master, "master mismatch");
            return Err(HashMismatchError {
                stored: stored.master.clone(),
                recomputed: recomputed.master,
            }
            .into());
        }

        // A proof without stage hashes is checked on its master alone.
        let anomaly = if stored.is_empty() {
            None
        } else {
            stage_diff(&stored.stage_hashes, &recomputed.stage_hashes)
        };
        if let Some(anomaly) = &anomaly {
            warn!(
                run = %run.id(),
                index = anomaly.index,
                stored = ?anomaly.stored,
                recomputed = ?anomaly.recomputed,
                stored_len = anomaly.stored_len,
                recomputed_len = anomaly.recomputed_len,
                "stage hashes differ but master matches"
            );
            if self.config.strict_stages {
                return Err(VerifyError::StageAnomaly(anomaly.clone()));
            }
        }

        info!(run = %run.id(), master = %recomputed.master, steps = recomputed.len(), "proof verified");
        Ok(VerifyReport {
            master: recomputed.master,
            stage_hashes: recomputed.stage_hashes,
            anomaly,
        })
    }

    /// Load a proof file and verify it
    ///
    /// # Errors
    ///
    /// As [`load_proof`] and [`Verifier::verify`]
    pub fn verify_file<S: ReasoningStep>(
        &self,
        path: impl AsRef<Path>,
        initial_state: Value,
        config: Value,
        code_version: &str,
        steps: &[S],
    ) -> Result<VerifyReport, VerifyError> {
        let stored = load_proof(path)?;
        self.verify(&stored, initial_state, config, code_version, steps)
    }
}

/// On-disk proof shape; `stage_hashes` may be absent
#[derive(Deserialize)]
struct ProofFile {
    master: Fingerprint,
    #[serde(default)]
    stage_hashes: Vec<Fingerprint>,
}

/// Read a proof from a JSON file
///
/// Only `master` is required. A missing `stage_hashes` reads as empty, and
/// other fields are ignored.
///
/// # Errors
///
/// Returns `VerifyError::ProofNotFound` if the file does not exist and
/// `VerifyError::Malformed` if it is not a proof
pub fn load_proof(path: impl AsRef<Path>) -> Result<Proof, VerifyError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            VerifyError::ProofNotFound {
                path: path.to_path_buf(),
            }
        } else {
            VerifyError::Io {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        }
    })?;
    let file: ProofFile = serde_json::from_str(&text).map_err(|err| VerifyError::Malformed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    Ok(Proof {
        stage_hashes: file.stage_hashes,
        master: file.master,
    })
}

/// Verify a proof file with the default configuration
///
/// # Errors
///
/// As [`Verifier::verify_file`]
pub fn verify_proof_file<S: ReasoningStep>(
    path: impl AsRef<Path>,
    initial_state: Value,
    config: Value,
    code_version: &str,
    steps: &[S],
) -> Result<VerifyReport, VerifyError> {
    Verifier::default().verify_file(path, initial_state, config, code_version, steps)
}
