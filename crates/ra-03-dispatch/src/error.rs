//! Dispatcher error types.

use ra_01_codec::CodecError;
use thiserror::Error;

/// Failures the dispatcher cannot answer with a response.
///
/// A request whose header cannot be read has nothing to correlate a
/// response with; reporting it is the transport's concern.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("undecodable request: {0}")]
    Decode(CodecError),

    #[error("response encoding failed: {0}")]
    Encode(CodecError),
}
