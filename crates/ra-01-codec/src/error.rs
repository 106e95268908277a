//! Codec error types.

use shared_types::ResultCode;
use thiserror::Error;

/// Errors raised while encoding or decoding a message.
///
/// Every variant is a protocol-level failure and maps to
/// `ResultCode::Exception` when reported over the wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Text does not have the expected shape (missing or mistyped field,
    /// out-of-range integer, over-capacity string).
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Header names an operation outside the closed operation set.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// Body parsed but violates a cross-field rule.
    #[error("invalid {op} body: {reason}")]
    InvalidBody { op: &'static str, reason: String },

    /// Header operation name disagrees with the body variant.
    #[error("header names {header} but body is {body}")]
    TagMismatch { header: String, body: &'static str },

    /// Serializer failure while encoding.
    #[error("serialization failed: {0}")]
    Serialize(String),
}

impl CodecError {
    pub fn result_code(&self) -> ResultCode {
        ResultCode::Exception
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Malformed(err.to_string())
    }
}
