//! chainproof core types
//!
//! Canonical encoding and fingerprinting. Pure functions of their input
//! bytes, no I/O, no global state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod canon;
pub mod error;
pub mod hash;
pub mod id;
pub mod lower;

// Re-exports
pub use canon::{CANON_VERSION, CanonConfig, canonical_bytes};
pub use error::{CoreResult, EncodingError};
pub use hash::{DigestAlgorithm, Fingerprint, Fingerprinter, UnknownAlgorithm, fingerprint};
pub use id::RunId;
