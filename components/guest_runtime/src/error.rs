//! Errors raised by the guest runtime

use thiserror::Error;

/// A guest runtime error, the equivalent of a raised `error(...)`
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GuestError {
    /// Generic runtime error with a message
    #[error("{0}")]
    Runtime(String),

    /// Attempt to call a value that is neither a function nor has `__call`
    #[error("attempt to call a {0} value")]
    NotCallable(&'static str),

    /// Attempt to index a value that is not a table and has no `__index`
    #[error("attempt to index a {0} value")]
    NotIndexable(&'static str),

    /// Invalid table key (nil or NaN)
    #[error("table index is {0}")]
    InvalidKey(&'static str),

    /// Stack protocol violation
    #[error("stack underflow: needed {needed} values, {available} available")]
    StackUnderflow {
        /// Values the operation required
        needed: usize,
        /// Values present on the stack
        available: usize,
    },

    /// Nested calls exceeded the configured limit
    #[error("call depth exceeded (limit {0})")]
    CallDepthExceeded(usize),
}

impl GuestError {
    /// Create a runtime error
    pub fn runtime(message: impl Into<String>) -> Self {
        GuestError::Runtime(message.into())
    }
}

/// Result type for guest operations
pub type GuestResult<T> = Result<T, GuestError>;
