//! Error type for host operations
//!
//! A host error is what the host runtime sees thrown out of a call.

use std::fmt;

/// Error type for host operations
#[derive(Debug, Clone, PartialEq)]
pub struct HostError {
    /// The error message
    pub message: String,
}

impl HostError {
    /// Create a new generic error
    pub fn new(message: impl Into<String>) -> Self {
        HostError {
            message: message.into(),
        }
    }

    /// Create a TypeError
    pub fn type_error(message: impl Into<String>) -> Self {
        HostError::new(format!("TypeError: {}", message.into()))
    }

    /// Create a RangeError
    pub fn range_error(message: impl Into<String>) -> Self {
        HostError::new(format!("RangeError: {}", message.into()))
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HostError {}

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;
