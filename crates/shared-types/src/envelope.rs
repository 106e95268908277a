//! # Wire Envelope
//!
//! The header carried by every request and response.
//!
//! ## Properties
//!
//! - **Correlation**: `request_id` identifies one in-flight request/response
//!   pair for the lifetime of a connection. A response echoes it.
//! - **Ordering**: `serial` increases monotonically per originator. It is used
//!   to detect reordering and duplication, never for correlation.
//! - **Dispatch**: the operation name selects the body codec, so a decoder
//!   never inspects the body to learn what it is.

use crate::{HostName, OpName};
use serde::{Deserialize, Serialize};

/// Header of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestHeader {
    /// Correlation identifier.
    pub request_id: u64,
    /// Wire name of the operation.
    pub request_name: OpName,
    /// Per-originator sequence number.
    pub serial: u64,
    /// Originating host.
    pub from: HostName,
}

/// Header of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseHeader {
    /// Correlation identifier copied from the request.
    pub request_id: u64,
    /// Wire name of the operation, copied from the request.
    pub response_name: OpName,
    /// Sequence number copied from the request.
    pub serial: u64,
    /// Responding host.
    pub from: HostName,
}

impl ResponseHeader {
    /// Builds the response header answering `request`, sent by `from`.
    pub fn answering(request: &RequestHeader, from: HostName) -> Self {
        Self {
            request_id: request.request_id,
            response_name: request.request_name,
            serial: request.serial,
            from,
        }
    }
}

/// Text layout of encoded messages. Has no semantic effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    #[default]
    Compact,
    Pretty,
}
