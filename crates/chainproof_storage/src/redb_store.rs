//! Single-file redb store.

use crate::record::ProofRecord;
use crate::store::{ProofStore, StoreError, ensure_dir, validate_label};
use chainproof_run::Proof;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the database inside the store root
pub const DB_FILE: &str = "proofs.redb";

const PROOFS: TableDefinition<&str, &[u8]> = TableDefinition::new("proofs");

fn backend<E: std::fmt::Display>(err: E) -> StoreError {
    StoreError::Backend {
        reason: err.to_string(),
    }
}

/// Stores all proofs in one redb table keyed by label.
///
/// Saving under an existing label replaces the previous record.
#[derive(Debug)]
pub struct RedbProofStore {
    db: Database,
    path: PathBuf,
}

impl RedbProofStore {
    /// Open or create `<root>/proofs.redb`
    ///
    /// # Errors
    ///
    /// Returns error if the directory or database cannot be created
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref();
        ensure_dir(root)?;
        let path = root.join(DB_FILE);
        let db = Database::create(&path).map_err(backend)?;

        // Create the table up front so read transactions always find it.
        let txn = db.begin_write().map_err(backend)?;
        txn.open_table(PROOFS).map_err(backend)?;
        txn.commit().map_err(backend)?;

        Ok(Self { db, path })
    }

    fn records(&self) -> Result<Vec<ProofRecord>, StoreError> {
        let txn = self.db.begin_read().map_err(backend)?;
        let table = txn.open_table(PROOFS).map_err(backend)?;
        let mut records = Vec::new();
        for entry in table.iter().map_err(backend)? {
            let (_, value) = entry.map_err(backend)?;
            records.push(decode(value.value())?);
        }
        Ok(records)
    }
}

fn decode(bytes: &[u8]) -> Result<ProofRecord, StoreError> {
    serde_json::from_slice(bytes).map_err(|err| StoreError::Serialization {
        reason: err.to_string(),
    })
}

impl ProofStore for RedbProofStore {
    fn save(&self, label: &str, proof: &Proof) -> Result<PathBuf, StoreError> {
        validate_label(label)?;
        let bytes = ProofRecord::new(label, proof).to_json()?.into_bytes();

        let txn = self.db.begin_write().map_err(backend)?;
        {
            let mut table = txn.open_table(PROOFS).map_err(backend)?;
            table.insert(label, bytes.as_slice()).map_err(backend)?;
        }
        txn.commit().map_err(backend)?;

        info!(label, master = %proof.master, path = %self.path.display(), "proof saved");
        Ok(self.path.clone())
    }

    fn load_record(&self, label: &str) -> Result<ProofRecord, StoreError> {
        validate_label(label)?;
        let txn = self.db.begin_read().map_err(backend)?;
        let table = txn.open_table(PROOFS).map_err(backend)?;
        let guard = table
            .get(label)
            .map_err(backend)?
            .ok_or_else(|| StoreError::NotFound {
                label: label.to_string(),
            })?;
        debug!(label, "proof loaded");
        decode(guard.value())
    }

    /// Labels, most recently saved first
    fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut records = self.records()?;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.label.cmp(&b.label)));
        Ok(records.into_iter().map(|r| r.label).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainproof_core::fingerprint;
    use chainproof_run::ProofBuilder;

    fn proof(seed: u64) -> Proof {
        ProofBuilder::default()
            .build(vec![fingerprint(&seed).unwrap()])
            .unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbProofStore::open(dir.path()).unwrap();
        let location = store.save("demo", &proof(1)).unwrap();
        assert_eq!(location, dir.path().join(DB_FILE));
        assert_eq!(store.load("demo").unwrap(), proof(1));
    }

    #[test]
    fn test_not_found_on_fresh_db() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbProofStore::open(dir.path()).unwrap();
        assert_eq!(
            store.load("missing").unwrap_err(),
            StoreError::NotFound {
                label: "missing".to_string()
            }
        );
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_latest_save_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbProofStore::open(dir.path()).unwrap();
        store.save("demo", &proof(1)).unwrap();
        store.save("demo", &proof(2)).unwrap();
        assert_eq!(store.load("demo").unwrap(), proof(2));
        assert_eq!(store.list().unwrap(), vec!["demo"]);
    }

    #[test]
    fn test_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbProofStore::open(dir.path()).unwrap();
        store.save("first", &proof(1)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.save("second", &proof(2)).unwrap();
        assert_eq!(store.list().unwrap(), vec!["second", "first"]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = RedbProofStore::open(dir.path()).unwrap();
            store.save("demo", &proof(3)).unwrap();
        }
        let store = RedbProofStore::open(dir.path()).unwrap();
        assert_eq!(store.load("demo").unwrap(), proof(3));
    }

    #[test]
    fn test_invalid_label() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbProofStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.save("", &proof(1)),
            Err(StoreError::InvalidLabel { .. })
        ));
    }
}
