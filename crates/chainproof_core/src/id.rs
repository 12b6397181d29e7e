//! Run identifiers.
//!
//! A `RunId` tags the log lines of one run so interleaved runs can be told
//! apart. It never enters a fingerprint, so two runs with different ids over
//! the same inputs still produce the same proof.

use std::fmt;
use uuid::Uuid;

/// Log tag for a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    /// Fresh random id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Fixed id, for reproducible log output in tests
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Leading eight hex digits, enough to tell runs in one log apart
    #[must_use]
    pub fn short(&self) -> String {
        self.0.as_bytes()[..4]
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_differ() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn test_display_uses_short_form() {
        let id = RunId::from_u128(0xdead_beef_0000_0000_0000_0000_0000_0001);
        assert_eq!(id.short(), "deadbeef");
        assert_eq!(id.to_string(), "run-deadbeef");
    }

    #[test]
    fn test_short_is_eight_hex_digits() {
        let short = RunId::new().short();
        assert_eq!(short.len(), 8);
        assert!(short.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
