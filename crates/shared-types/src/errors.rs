//! # Error Types
//!
//! Construction errors for the wire primitives.

use thiserror::Error;

/// Errors raised while building a wire primitive from untrusted input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    /// String does not fit the fixed capacity of its field.
    #[error("string of {len} bytes exceeds capacity of {capacity} bytes")]
    StringTooLong { len: usize, capacity: usize },

    /// GUID text is not 16 hex-encoded bytes.
    #[error("invalid guid: {0}")]
    InvalidGuid(String),
}
