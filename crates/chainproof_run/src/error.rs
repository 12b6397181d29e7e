//! Run and proof errors.

use chainproof_core::{EncodingError, Fingerprint};

/// A run could not proceed deterministically.
///
/// Always fatal to the run it came from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeterminismError {
    /// No step is registered under this name
    #[error("step is not registered: {name}")]
    UnknownStep {
        /// Requested step name
        name: String,
    },

    /// The step returned an error
    #[error("step {name} (index {index}) failed: {reason}")]
    StepFailed {
        /// Step name
        name: String,
        /// Position the step would have taken
        index: usize,
        /// Error reported by the step
        reason: String,
    },

    /// The step panicked
    #[error("step {name} (index {index}) panicked: {message}")]
    StepPanicked {
        /// Step name
        name: String,
        /// Position the step would have taken
        index: usize,
        /// Panic payload, if it was a string
        message: String,
    },

    /// `finalize` was called before any step was added
    #[error("no steps added to run")]
    EmptyRun,

    /// `verify` was called before `finalize`
    #[error("run must be finalized before verification")]
    NotFinalized,

    /// The step payload could not be canonically encoded
    #[error("step {name} payload could not be encoded: {source}")]
    Encoding {
        /// Step name
        name: String,
        /// Canonicalizer failure
        #[source]
        source: EncodingError,
    },

    /// Proof construction failed
    #[error(transparent)]
    Proof(#[from] ProofError),
}

/// A recomputed master proof differs from the expected one
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("master proof mismatch: stored {stored}, recomputed {recomputed}")]
pub struct HashMismatchError {
    /// Master that was expected
    pub stored: Fingerprint,
    /// Master obtained by recomputation
    pub recomputed: Fingerprint,
}

/// Proof construction or integrity errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    /// No stage hashes to aggregate
    #[error("cannot build a proof from zero stage hashes")]
    Empty,

    /// A stage hash is not a 64-character lowercase hex fingerprint
    #[error("stage hash {index} is not a well-formed fingerprint: {value:?}")]
    MalformedFingerprint {
        /// Position in the stage hash sequence
        index: usize,
        /// Offending text
        value: String,
    },

    /// The stored master does not match its own stage hashes
    #[error("proof is inconsistent: {0}")]
    MasterMismatch(#[from] HashMismatchError),

    /// Encoding of the concatenation failed
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// Errors from verifying a run against its own cached proof
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    /// The run could not be recomputed
    #[error(transparent)]
    Determinism(#[from] DeterminismError),

    /// The recomputed master differs from the cached one
    #[error(transparent)]
    HashMismatch(#[from] HashMismatchError),
}
