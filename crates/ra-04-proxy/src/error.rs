//! Client error types.

use crate::ports::TransportError;
use ra_01_codec::{CodecError, OpTag};
use shared_types::ResultCode;
use thiserror::Error;

/// Failure of a client API call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Rejected before any round trip.
    #[error("invalid parameter: {0}")]
    InvalidParam(&'static str),

    /// The proxy key no longer names a live proxy.
    #[error("stale proxy")]
    StaleProxy,

    #[error("protocol error: {0}")]
    Protocol(#[from] CodecError),

    #[error("response {got_id}/{got_op} does not answer request {expected_id}/{expected_op}")]
    CorrelationMismatch {
        expected_id: u64,
        expected_op: OpTag,
        got_id: u64,
        got_op: OpTag,
    },

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The request may or may not have been applied by the agent.
    #[error("outcome of {op} unknown")]
    OutcomeUnknown { op: OpTag },

    /// The agent answered with a failure result.
    #[error("remote call failed: {0}")]
    Remote(ResultCode),
}

impl RemoteError {
    pub fn result_code(&self) -> ResultCode {
        match self {
            RemoteError::InvalidParam(_) | RemoteError::StaleProxy => ResultCode::InvalidParam,
            RemoteError::Protocol(_)
            | RemoteError::CorrelationMismatch { .. }
            | RemoteError::OutcomeUnknown { .. } => ResultCode::Exception,
            RemoteError::Transport(_) => ResultCode::NoDaemon,
            RemoteError::Remote(code) => *code,
        }
    }
}
