//! Fingerprints over canonical bytes.
//!
//! SHA-256 by default, BLAKE3 on request. Both produce 256-bit digests, so
//! every well-formed fingerprint is exactly 64 lowercase hex characters.

use crate::canon::CanonConfig;
use crate::error::CoreResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Digest algorithm used for fingerprints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256 (default)
    #[default]
    Sha256,
    /// BLAKE3
    Blake3,
}

impl DigestAlgorithm {
    /// Number of digest bytes
    pub const LEN: usize = 32;

    /// Digest raw bytes
    #[must_use]
    pub fn digest(&self, data: &[u8]) -> [u8; 32] {
        match self {
            Self::Sha256 => Sha256::digest(data).into(),
            Self::Blake3 => *blake3::hash(data).as_bytes(),
        }
    }

    /// Stable name of the algorithm
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Unrecognized digest algorithm name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown digest algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

/// Hex fingerprint of a canonical payload.
///
/// Fingerprints computed here are always well formed. Fingerprints read back
/// from storage keep the exact text that was stored, so a corrupted value
/// still compares unequal instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Length of a well-formed fingerprint in hex characters
    pub const HEX_LEN: usize = DigestAlgorithm::LEN * 2;

    /// Create from a raw digest
    #[must_use]
    pub fn from_digest(bytes: [u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Wrap stored text without validating it
    #[must_use]
    pub fn from_stored(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Parse well-formed text
    ///
    /// Returns `None` unless the text is exactly 64 lowercase hex characters.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let fp = Self(text.to_string());
        fp.is_well_formed().then_some(fp)
    }

    /// Whether this is 64 lowercase hex characters
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == Self::HEX_LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

/// Computes fingerprints with a fixed algorithm and canonical configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprinter {
    /// Digest algorithm
    pub algorithm: DigestAlgorithm,
    /// Canonical encoder settings
    pub canon: CanonConfig,
}

impl Fingerprinter {
    /// Create with an algorithm and the default canonical settings
    #[must_use]
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self {
            algorithm,
            canon: CanonConfig::default(),
        }
    }

    /// Fingerprint any serializable payload
    ///
    /// # Errors
    ///
    /// Returns error if the payload cannot be canonically encoded
    pub fn fingerprint<T: Serialize + ?Sized>(&self, payload: &T) -> CoreResult<Fingerprint> {
        let bytes = self.canon.encode(payload)?;
        Ok(self.fingerprint_bytes(&bytes))
    }

    /// Fingerprint a JSON value
    ///
    /// # Errors
    ///
    /// Returns error if the value is nested too deeply
    pub fn fingerprint_value(&self, value: &Value) -> CoreResult<Fingerprint> {
        let bytes = self.canon.encode_value(value)?;
        Ok(self.fingerprint_bytes(&bytes))
    }

    /// Fingerprint bytes that are already canonical
    #[must_use]
    pub fn fingerprint_bytes(&self, bytes: &[u8]) -> Fingerprint {
        Fingerprint::from_digest(self.algorithm.digest(bytes))
    }
}

/// Fingerprint a payload with the default algorithm and settings
///
/// # Errors
///
/// Returns error if the payload cannot be canonically encoded
pub fn fingerprint<T: Serialize + ?Sized>(payload: &T) -> CoreResult<Fingerprint> {
    Fingerprinter::default().fingerprint(payload)
}
