//! Persisted proof record.

use crate::store::StoreError;
use chainproof_core::Fingerprint;
use chainproof_run::Proof;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A labelled proof as written to storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRecord {
    /// Caller-chosen label
    pub label: String,
    /// Master fingerprint
    pub master: Fingerprint,
    /// Step fingerprints in run order
    pub stage_hashes: Vec<Fingerprint>,
    /// When the record was saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ProofRecord {
    /// Create a record stamped with the current time
    #[must_use]
    pub fn new(label: impl Into<String>, proof: &Proof) -> Self {
        Self {
            label: label.into(),
            master: proof.master.clone(),
            stage_hashes: proof.stage_hashes.clone(),
            timestamp: Some(Utc::now()),
        }
    }

    /// Get the proof
    #[must_use]
    pub fn proof(&self) -> Proof {
        Proof {
            stage_hashes: self.stage_hashes.clone(),
            master: self.master.clone(),
        }
    }

    /// Consume into the proof
    #[must_use]
    pub fn into_proof(self) -> Proof {
        Proof {
            stage_hashes: self.stage_hashes,
            master: self.master,
        }
    }

    /// Serialize as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(self).map_err(|err| StoreError::Serialization {
            reason: err.to_string(),
        })
    }

    /// Parse from JSON
    ///
    /// # Errors
    ///
    /// Returns error if the text is not a proof record
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|err| StoreError::Serialization {
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainproof_core::fingerprint;
    use chainproof_run::ProofBuilder;

    fn proof() -> Proof {
        ProofBuilder::default()
            .build(vec![fingerprint(&1).unwrap(), fingerprint(&2).unwrap()])
            .unwrap()
    }

    #[test]
    fn test_json_fields() {
        let record = ProofRecord::new("demo", &proof());
        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(value["label"], "demo");
        assert_eq!(value["master"], record.master.as_str());
        assert_eq!(value["stage_hashes"].as_array().unwrap().len(), 2);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_pretty_two_space_indent() {
        let json = ProofRecord::new("demo", &proof()).to_json().unwrap();
        assert!(json.contains("\n  \"label\": \"demo\""));
    }

    #[test]
    fn test_timestamp_optional() {
        let p = proof();
        let json = format!(
            r#"{{"label": "old", "master": "{}", "stage_hashes": ["{}", "{}"]}}"#,
            p.master, p.stage_hashes[0], p.stage_hashes[1]
        );
        let record = ProofRecord::from_json(&json).unwrap();
        assert_eq!(record.timestamp, None);
        assert_eq!(record.into_proof(), p);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            ProofRecord::from_json("[1, 2]"),
            Err(StoreError::Serialization { .. })
        ));
    }
}
