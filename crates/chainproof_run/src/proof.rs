//! Master proof aggregation.
//!
//! `master = fingerprint(stage_hashes[0] || stage_hashes[1] || ...)`. Every
//! stage hash is exactly 64 hex characters, so the concatenation splits back
//! into the original sequence in only one way.

use crate::error::{HashMismatchError, ProofError};
use chainproof_core::{Fingerprint, Fingerprinter};
use serde::{Deserialize, Serialize};

/// Ordered stage hashes and their master fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Step fingerprints in run order
    pub stage_hashes: Vec<Fingerprint>,
    /// Fingerprint of the concatenated stage hashes
    pub master: Fingerprint,
}

impl Proof {
    /// Number of stages
    #[must_use]
    pub fn len(&self) -> usize {
        self.stage_hashes.len()
    }

    /// Check if the proof has no stages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stage_hashes.is_empty()
    }

    /// Recompute the master from the stored stage hashes
    ///
    /// # Errors
    ///
    /// Returns error if there are no stage hashes or one is malformed
    pub fn recompute_master(&self, fingerprinter: &Fingerprinter) -> Result<Fingerprint, ProofError> {
        ProofBuilder::new(*fingerprinter).master_of(&self.stage_hashes)
    }

    /// Check that `master` matches `stage_hashes` without replaying the run
    ///
    /// # Errors
    ///
    /// Returns `ProofError::MasterMismatch` if the stored master is stale or
    /// tampered with
    pub fn check_integrity(&self, fingerprinter: &Fingerprinter) -> Result<(), ProofError> {
        let recomputed = self.recompute_master(fingerprinter)?;
        if recomputed != self.master {
            return Err(HashMismatchError {
                stored: self.master.clone(),
                recomputed,
            }
            .into());
        }
        Ok(())
    }
}

/// Builds proofs from ordered step fingerprints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProofBuilder {
    fingerprinter: Fingerprinter,
}

impl ProofBuilder {
    /// Create a builder using the given fingerprinter
    #[must_use]
    pub fn new(fingerprinter: Fingerprinter) -> Self {
        Self { fingerprinter }
    }

    /// Build a proof, taking ownership of the stage hashes
    ///
    /// # Errors
    ///
    /// Returns error if there are no stage hashes or one is malformed
    pub fn build(&self, stage_hashes: Vec<Fingerprint>) -> Result<Proof, ProofError> {
        let master = self.master_of(&stage_hashes)?;
        Ok(Proof {
            stage_hashes,
            master,
        })
    }

    /// Compute the master fingerprint of a stage hash sequence
    ///
    /// # Errors
    ///
    /// Returns error if there are no stage hashes or one is malformed
    pub fn master_of(&self, stage_hashes: &[Fingerprint]) -> Result<Fingerprint, ProofError> {
        if stage_hashes.is_empty() {
            return Err(ProofError::Empty);
        }

        let mut concatenated = String::with_capacity(stage_hashes.len() * Fingerprint::HEX_LEN);
        for (index, fp) in stage_hashes.iter().enumerate() {
            if !fp.is_well_formed() {
                return Err(ProofError::MalformedFingerprint {
                    index,
                    value: fp.as_str().to_string(),
                });
            }
            concatenated.push_str(fp.as_str());
        }

        Ok(self.fingerprinter.fingerprint(concatenated.as_str())?)
    }
}
