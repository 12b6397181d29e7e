//! One JSON file per proof.

use crate::record::ProofRecord;
use crate::store::{ProofStore, StoreError, ensure_dir, validate_label};
use chainproof_run::Proof;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

const EXTENSION: &str = "json";

/// Stores each proof as `<root>/<label>.json`
#[derive(Debug, Clone)]
pub struct JsonProofStore {
    root: PathBuf,
}

impl JsonProofStore {
    /// Open a store rooted at `root`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        ensure_dir(&root)?;
        Ok(Self { root })
    }

    /// File that holds `label`
    ///
    /// # Errors
    ///
    /// Returns error if the label is invalid
    pub fn path_for(&self, label: &str) -> Result<PathBuf, StoreError> {
        validate_label(label)?;
        Ok(self.root.join(format!("{label}.{EXTENSION}")))
    }
}

impl ProofStore for JsonProofStore {
    fn save(&self, label: &str, proof: &Proof) -> Result<PathBuf, StoreError> {
        let path = self.path_for(label)?;
        let json = ProofRecord::new(label, proof).to_json()?;

        // Write beside the target and rename so readers never see a torn file.
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.as_file_mut().write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|err| StoreError::from(err.error))?;
        info!(label, master = %proof.master, path = %path.display(), "proof saved");
        Ok(path)
    }

    fn load_record(&self, label: &str) -> Result<ProofRecord, StoreError> {
        let path = self.path_for(label)?;
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    label: label.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        };
        debug!(label, path = %path.display(), "proof loaded");
        ProofRecord::from_json(&text)
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut labels = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                labels.push(stem.to_string());
            }
        }
        labels.sort();
        Ok(labels)
    }
}
