//! # Response Bodies
//!
//! Every body has a `Default`, used when a failure response carries no
//! (or an unreadable) body.

use crate::error::CodecError;
use crate::ops::Validate;
use serde::{Deserialize, Serialize};
use shared_types::{
    ErrorInfo, HandleHeader, Properties, RemoteId, SysobjectName, SysobjectType, TokenHeader,
};

/// Upper bound on the text returned by a sysobject read (bytes).
pub const OBJECT_VALUE_MAX: usize = 4096;

/// Body of operations that return nothing but a result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnumerateResponse {
    /// Registered tokens, at most `max_tokens` of them.
    pub tokens: Vec<TokenHeader>,
    /// Number of accelerators that matched, regardless of `max_tokens`.
    pub num_matches: u32,
}

impl Validate for EnumerateResponse {
    fn validate(&self) -> Result<(), CodecError> {
        if self.tokens.len() > self.num_matches as usize {
            return Err(CodecError::InvalidBody {
                op: "enumerate",
                reason: format!(
                    "{} tokens returned for {} matches",
                    self.tokens.len(),
                    self.num_matches
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: TokenHeader,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropertiesResponse {
    pub properties: Properties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenResponse {
    pub handle: HandleHeader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MmioIdResponse {
    pub mmio_id: RemoteId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Value32Response {
    pub value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Value64Response {
    pub value: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BufferIdResponse {
    pub buf_id: RemoteId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IoAddressResponse {
    pub ioaddr: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorInfoResponse {
    pub error_info: ErrorInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectIdResponse {
    pub object_id: RemoteId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectTypeResponse {
    pub object_type: SysobjectType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NameResponse {
    pub name: SysobjectName,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectReadResponse {
    pub value: String,
}

impl Validate for ObjectReadResponse {
    fn validate(&self) -> Result<(), CodecError> {
        if self.value.len() > OBJECT_VALUE_MAX {
            return Err(CodecError::InvalidBody {
                op: "object_read",
                reason: format!(
                    "value of {} bytes exceeds {OBJECT_VALUE_MAX}",
                    self.value.len()
                ),
            });
        }
        Ok(())
    }
}

impl Validate for Empty {}
impl Validate for TokenResponse {}
impl Validate for PropertiesResponse {}
impl Validate for OpenResponse {}
impl Validate for MmioIdResponse {}
impl Validate for Value32Response {}
impl Validate for Value64Response {}
impl Validate for BufferIdResponse {}
impl Validate for IoAddressResponse {}
impl Validate for ErrorInfoResponse {}
impl Validate for ObjectIdResponse {}
impl Validate for ObjectTypeResponse {}
impl Validate for NameResponse {}
