//! Registry error types.

use shared_types::{RemoteId, ResultCode};
use std::fmt;
use thiserror::Error;

/// The resource kinds a context tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryKind {
    Token,
    Handle,
    Mmio,
    Buffer,
    Sysobject,
}

impl RegistryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RegistryKind::Token => "token",
            RegistryKind::Handle => "handle",
            RegistryKind::Mmio => "mmio",
            RegistryKind::Buffer => "buffer",
            RegistryKind::Sysobject => "sysobject",
        }
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry failures.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The identity is stale, foreign, or never existed.
    #[error("{kind} {id} not found")]
    NotFound { kind: RegistryKind, id: RemoteId },

    /// The identity is already registered. Indicates a generator bug.
    #[error("{kind} {id} already registered")]
    Duplicate { kind: RegistryKind, id: RemoteId },
}

impl RegistryError {
    pub fn result_code(&self) -> ResultCode {
        match self {
            RegistryError::NotFound { .. } => ResultCode::NotFound,
            RegistryError::Duplicate { .. } => ResultCode::Exception,
        }
    }
}

impl From<RegistryError> for ResultCode {
    fn from(err: RegistryError) -> Self {
        err.result_code()
    }
}
