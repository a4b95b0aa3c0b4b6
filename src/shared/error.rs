//! Shared Error Types
//!
//! Errors raised while decoding or validating frames. They never cross the
//! wire themselves; the dispatcher turns them into log lines or, when error
//! acknowledgements are enabled, into an `error` frame.
//!
//! # Error Categories
//!
//! - `SerializationError` - the frame is not a JSON envelope at all
//! - `PayloadError` - the envelope names a known kind but its `data` does not fit
//! - `ValidationError` - the payload parsed but a field is unusable
//!
//! # Usage
//!
//! ```rust
//! use socialnet::shared::error::SharedError;
//!
//! let error = SharedError::validation("to", "Recipient cannot be empty");
//! assert!(error.to_string().contains("to"));
//! ```
use thiserror::Error;

/// Errors that can occur while handling wire frames
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
    },

    /// Known frame kind with a payload that does not match its shape
    #[error("Invalid '{kind}' payload: {message}")]
    PayloadError {
        /// Frame kind taken from the envelope `type`
        kind: String,
        /// Human-readable error message
        message: String,
    },

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },
}

impl SharedError {
    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create a new payload error for the given frame kind
    pub fn payload(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PayloadError {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
