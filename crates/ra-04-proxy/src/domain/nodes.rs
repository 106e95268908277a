//! Proxy node types.
//!
//! Each node holds the remote identity it stands for plus keys to the
//! nodes it was derived from. Keys are routing links, not ownership: a key
//! whose target is gone simply fails to resolve.

use super::arena::Key;
use shared_types::{Properties, RemoteId};

pub type Token = Key<TokenProxy>;
pub type Handle = Key<HandleProxy>;
pub type Mmio = Key<MmioProxy>;
pub type Buffer = Key<BufferProxy>;
pub type Sysobject = Key<SysobjectProxy>;

/// An enumerated accelerator, not yet opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenProxy {
    pub remote_id: RemoteId,
    /// Last properties snapshot received from the agent.
    pub properties: Properties,
    pub indeterminate: bool,
}

/// An open accelerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleProxy {
    pub remote_id: RemoteId,
    /// Token the handle was opened from. May outlive its target.
    pub token: Token,
    pub token_id: RemoteId,
    pub flags: i32,
    pub indeterminate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmioProxy {
    pub remote_id: RemoteId,
    pub handle: Handle,
    pub mmio_num: u32,
    pub indeterminate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferProxy {
    pub remote_id: RemoteId,
    pub handle: Handle,
    pub len: u64,
    pub pre_allocated_addr: Option<u64>,
    pub indeterminate: bool,
}

/// Node that produced a sysobject tree. Nested objects inherit the root's
/// owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectOwner {
    Token(Token),
    Handle(Handle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysobjectProxy {
    pub remote_id: RemoteId,
    pub owner: ObjectOwner,
    pub parent: Option<Sysobject>,
    pub indeterminate: bool,
}

/// Any proxy key, used where an operation targets one node of any kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyRef {
    Token(Token),
    Handle(Handle),
    Mmio(Mmio),
    Buffer(Buffer),
    Sysobject(Sysobject),
}
