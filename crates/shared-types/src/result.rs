//! # Result Codes
//!
//! The outcome of every remote operation. The agent reports the code its
//! device driver returned; transport-level failures are reported by the
//! client-side error type instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of a remote accelerator operation.
///
/// Usable as the error half of a `Result`; `Ok` only appears in response
/// bodies and is never returned as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    #[default]
    #[error("ok")]
    Ok,
    #[error("invalid parameter")]
    InvalidParam,
    #[error("resource busy")]
    Busy,
    #[error("exception")]
    Exception,
    #[error("not found")]
    NotFound,
    #[error("out of memory")]
    NoMemory,
    #[error("not supported")]
    NotSupported,
    #[error("no driver available")]
    NoDriver,
    #[error("no daemon available")]
    NoDaemon,
    #[error("access denied")]
    NoAccess,
    #[error("reconfiguration error")]
    ReconfError,
}

impl ResultCode {
    pub fn is_ok(self) -> bool {
        self == ResultCode::Ok
    }

    /// Converts the code into a `Result`, mapping `Ok` to `Ok(())`.
    pub fn into_result(self) -> Result<(), ResultCode> {
        match self {
            ResultCode::Ok => Ok(()),
            code => Err(code),
        }
    }

    /// Stable label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            ResultCode::Ok => "ok",
            ResultCode::InvalidParam => "invalid_param",
            ResultCode::Busy => "busy",
            ResultCode::Exception => "exception",
            ResultCode::NotFound => "not_found",
            ResultCode::NoMemory => "no_memory",
            ResultCode::NotSupported => "not_supported",
            ResultCode::NoDriver => "no_driver",
            ResultCode::NoDaemon => "no_daemon",
            ResultCode::NoAccess => "no_access",
            ResultCode::ReconfError => "reconf_error",
        }
    }
}

/// Result of a device driver call.
pub type DriverResult<T> = Result<T, ResultCode>;
