//! Proof store interface and configuration.

use crate::json::JsonProofStore;
use crate::record::ProofRecord;
use crate::redb_store::RedbProofStore;
use chainproof_run::Proof;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Store error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No proof under this label
    #[error("proof not found: {label}")]
    NotFound {
        /// Requested label
        label: String,
    },
    /// Label cannot be used as a storage key
    #[error("invalid label {label:?}: {reason}")]
    InvalidLabel {
        /// Offending label
        label: String,
        /// Why it was rejected
        reason: &'static str,
    },
    /// Filesystem error
    #[error("io error: {reason}")]
    Io {
        /// OS error message
        reason: String,
    },
    /// Record could not be encoded or decoded
    #[error("serialization error: {reason}")]
    Serialization {
        /// Serializer message
        reason: String,
    },
    /// Database error
    #[error("backend error: {reason}")]
    Backend {
        /// Database message
        reason: String,
    },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            reason: err.to_string(),
        }
    }
}

/// Persistence of labelled proofs
pub trait ProofStore: Send + Sync {
    /// Save a proof under `label`, returning where it was written
    ///
    /// # Errors
    ///
    /// Returns error if the label is invalid or the write fails
    fn save(&self, label: &str, proof: &Proof) -> Result<PathBuf, StoreError>;

    /// Load the full record saved under `label`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if nothing is saved under `label`
    fn load_record(&self, label: &str) -> Result<ProofRecord, StoreError>;

    /// List stored labels
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read
    fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Load the proof saved under `label`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if nothing is saved under `label`
    fn load(&self, label: &str) -> Result<Proof, StoreError> {
        self.load_record(label).map(ProofRecord::into_proof)
    }
}

/// Storage backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One JSON file per label
    #[default]
    Json,
    /// Single redb database
    Redb,
}

impl Backend {
    /// Name used on the command line
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Redb => "redb",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized backend name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown storage backend: {0} (expected json or redb)")]
pub struct UnknownBackend(pub String);

impl std::str::FromStr for Backend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "redb" => Ok(Self::Redb),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Storage directory
    pub root: PathBuf,
    /// Backend kind
    pub backend: Backend,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".chainproof"),
            backend: Backend::Json,
        }
    }
}

/// Open the store described by `config`
///
/// # Errors
///
/// Returns error if the root directory or database cannot be created
pub fn open_store(config: &StoreConfig) -> Result<Box<dyn ProofStore>, StoreError> {
    Ok(match config.backend {
        Backend::Json => Box::new(JsonProofStore::open(&config.root)?),
        Backend::Redb => Box::new(RedbProofStore::open(&config.root)?),
    })
}

/// Reject labels that cannot be used as file names
pub(crate) fn validate_label(label: &str) -> Result<(), StoreError> {
    let reason = if label.is_empty() {
        "label is empty"
    } else if label == "." || label == ".." {
        "label is a relative path component"
    } else if label.contains(['/', '\\']) {
        "label contains a path separator"
    } else if label.contains('\0') {
        "label contains a NUL byte"
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidLabel {
        label: label.to_string(),
        reason,
    })
}

pub(crate) fn ensure_dir(root: &Path) -> Result<(), StoreError> {
    std::fs::create_dir_all(root)?;
    Ok(())
}
