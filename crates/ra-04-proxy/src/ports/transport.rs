//! Transport port: one blocking round trip per call.

use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No response arrived in time; the request may still be applied.
    #[error("timed out waiting for response")]
    Timeout,

    #[error("connection closed")]
    Closed,

    #[error("i/o failure: {0}")]
    Io(String),
}

/// Carries one encoded request to the agent and returns its encoded reply.
///
/// Retries and backoff belong to implementations, never to callers.
pub trait Transport: Send + Sync {
    fn send_and_receive(&self, request: &str) -> Result<String, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send_and_receive(&self, request: &str) -> Result<String, TransportError> {
        (**self).send_and_receive(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_and_receive(&self, request: &str) -> Result<String, TransportError> {
        (**self).send_and_receive(request)
    }
}
