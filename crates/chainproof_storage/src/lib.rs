//! chainproof storage
//!
//! Labelled proof persistence with a JSON file backend and a redb backend.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod json;
pub mod record;
pub mod redb_store;
pub mod store;

pub use json::JsonProofStore;
pub use record::ProofRecord;
pub use redb_store::RedbProofStore;
pub use store::{Backend, ProofStore, StoreConfig, StoreError, UnknownBackend, open_store};
