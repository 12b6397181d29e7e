//! Core error types for chainproof.

use std::fmt;

/// Core result type
pub type CoreResult<T> = Result<T, EncodingError>;

/// A payload could not be canonically encoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    /// Nesting went deeper than the configured limit
    #[error("nesting depth exceeds limit of {limit}")]
    DepthExceeded {
        /// Configured maximum depth
        limit: usize,
    },

    /// A float was NaN or infinite
    #[error("non-finite float cannot be canonically encoded: {value}")]
    NonFinite {
        /// Debug rendering of the offending value
        value: String,
    },

    /// A mapping key did not lower to a string
    #[error("mapping key must be a string, got {kind}")]
    NonStringKey {
        /// Kind of value found in key position
        kind: &'static str,
    },

    /// The value's `Serialize` impl failed or produced unsupported content
    #[error("value is not serializable: {reason}")]
    Unserializable {
        /// Message from the serializer
        reason: String,
    },
}

impl serde::ser::Error for EncodingError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::Unserializable {
            reason: msg.to_string(),
        }
    }
}
