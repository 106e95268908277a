//! # Request Bodies
//!
//! One record per operation. Identities travel as full `RemoteId`s; the
//! agent resolves them before touching the device.

use crate::error::CodecError;
use crate::ops::Validate;
use serde::{Deserialize, Serialize};
use shared_types::{Properties, RemoteId, SysobjectName};

// =============================================================================
// TOKENS
// =============================================================================

/// Enumerate accelerators matching any of `filters`.
///
/// An empty filter list matches every accelerator. `max_tokens` caps how
/// many tokens are returned; zero turns the call into a pure count.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnumerateRequest {
    pub filters: Vec<Properties>,
    pub num_filters: u32,
    pub max_tokens: u32,
}

impl EnumerateRequest {
    /// Fails when the filter count does not fit the wire's `num_filters`.
    pub fn new(filters: Vec<Properties>, max_tokens: u32) -> Result<Self, CodecError> {
        Ok(Self {
            num_filters: filter_count(filters.len())?,
            filters,
            max_tokens,
        })
    }
}

fn filter_count(len: usize) -> Result<u32, CodecError> {
    u32::try_from(len).map_err(|_| CodecError::InvalidBody {
        op: "enumerate",
        reason: format!("{len} filters exceed the u32 filter count"),
    })
}

impl Validate for EnumerateRequest {
    fn validate(&self) -> Result<(), CodecError> {
        if self.num_filters as usize != self.filters.len() {
            return Err(CodecError::InvalidBody {
                op: "enumerate",
                reason: format!(
                    "num_filters is {} but {} filters present",
                    self.num_filters,
                    self.filters.len()
                ),
            });
        }
        Ok(())
    }
}

/// Body of operations addressed to a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    pub token_id: RemoteId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneTokenRequest {
    pub src_token_id: RemoteId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRequest {
    pub token_id: RemoteId,
    pub flags: i32,
}

// =============================================================================
// HANDLES
// =============================================================================

/// Body of operations addressed to a single open handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleRequest {
    pub handle_id: RemoteId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapMmioRequest {
    pub handle_id: RemoteId,
    pub mmio_num: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmapMmioRequest {
    pub handle_id: RemoteId,
    pub mmio_id: RemoteId,
    pub mmio_num: u32,
}

/// Read of a 32- or 64-bit register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MmioReadRequest {
    pub handle_id: RemoteId,
    pub mmio_num: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteMmio32Request {
    pub handle_id: RemoteId,
    pub mmio_num: u32,
    pub offset: u64,
    pub value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteMmio64Request {
    pub handle_id: RemoteId,
    pub mmio_num: u32,
    pub offset: u64,
    pub value: u64,
}

/// 512-bit write, carried as eight 64-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteMmio512Request {
    pub handle_id: RemoteId,
    pub mmio_num: u32,
    pub offset: u64,
    pub values: [u64; 8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareBufferRequest {
    pub handle_id: RemoteId,
    pub len: u64,
    /// Caller-pinned address, if the buffer is already allocated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_allocated_addr: Option<u64>,
    pub flags: i32,
}

/// Body of operations addressed to one shared buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferRequest {
    pub handle_id: RemoteId,
    pub buf_id: RemoteId,
}

// =============================================================================
// ERROR REGISTERS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRequest {
    pub token_id: RemoteId,
    pub error_num: u32,
}

// =============================================================================
// SYSOBJECTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGetObjectRequest {
    pub token_id: RemoteId,
    pub name: SysobjectName,
    pub flags: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleGetObjectRequest {
    pub handle_id: RemoteId,
    pub name: SysobjectName,
    pub flags: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectGetObjectRequest {
    pub object_id: RemoteId,
    pub name: SysobjectName,
    pub flags: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectGetObjectAtRequest {
    pub object_id: RemoteId,
    pub idx: u64,
}

/// Body of operations addressed to a single sysobject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRequest {
    pub object_id: RemoteId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFlagsRequest {
    pub object_id: RemoteId,
    pub flags: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReadRequest {
    pub object_id: RemoteId,
    pub offset: u64,
    pub len: u64,
    pub flags: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectWrite64Request {
    pub object_id: RemoteId,
    pub value: u64,
    pub flags: i32,
}

impl Validate for TokenRequest {}
impl Validate for CloneTokenRequest {}
impl Validate for OpenRequest {}
impl Validate for HandleRequest {}
impl Validate for MapMmioRequest {}
impl Validate for UnmapMmioRequest {}
impl Validate for MmioReadRequest {}
impl Validate for WriteMmio32Request {}
impl Validate for WriteMmio64Request {}
impl Validate for WriteMmio512Request {}
impl Validate for PrepareBufferRequest {}
impl Validate for BufferRequest {}
impl Validate for ErrorRequest {}
impl Validate for TokenGetObjectRequest {}
impl Validate for HandleGetObjectRequest {}
impl Validate for ObjectGetObjectRequest {}
impl Validate for ObjectGetObjectAtRequest {}
impl Validate for ObjectRequest {}
impl Validate for ObjectFlagsRequest {}
impl Validate for ObjectReadRequest {}
impl Validate for ObjectWrite64Request {}
