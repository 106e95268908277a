//! # Resource State
//!
//! What the registry maps each identity to. Native driver state that a
//! teardown must consume lives in an `Option` behind a lock, so exactly one
//! caller takes it and later callers observe the resource as gone.
//!
//! ## Locking
//!
//! A handle's native state, mapped regions and buffers share one
//! `HandleSlot` mutex: holding it serializes device operations on that
//! handle. Registry map locks are leaves; nothing else is acquired while
//! one is held. A handle slot may be held while a sysobject's native lock
//! is taken, never the reverse.

use parking_lot::{Mutex, RwLock};
use shared_types::RemoteId;
use std::collections::{BTreeMap, HashMap};

/// An enumerated accelerator.
pub struct TokenEntry<T> {
    pub token_id: RemoteId,
    pub native: RwLock<Option<T>>,
}

impl<T> TokenEntry<T> {
    pub fn new(token_id: RemoteId, native: T) -> Self {
        Self {
            token_id,
            native: RwLock::new(Some(native)),
        }
    }
}

/// Mutable state of one open handle.
pub struct HandleSlot<H, M, B> {
    pub native: Option<H>,
    /// Mapped regions by region index.
    pub regions: BTreeMap<u32, (RemoteId, M)>,
    pub buffers: HashMap<RemoteId, B>,
}

/// An opened accelerator.
pub struct HandleEntry<H, M, B> {
    pub handle_id: RemoteId,
    pub token_id: RemoteId,
    pub flags: i32,
    pub slot: Mutex<HandleSlot<H, M, B>>,
}

impl<H, M, B> HandleEntry<H, M, B> {
    pub fn new(handle_id: RemoteId, token_id: RemoteId, flags: i32, native: H) -> Self {
        Self {
            handle_id,
            token_id,
            flags,
            slot: Mutex::new(HandleSlot {
                native: Some(native),
                regions: BTreeMap::new(),
                buffers: HashMap::new(),
            }),
        }
    }
}

/// A mapped register region. The native mapping lives in its handle's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmioEntry {
    pub mmio_id: RemoteId,
    pub handle_id: RemoteId,
    pub mmio_num: u32,
}

/// A shared buffer. The native buffer lives in its handle's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferEntry {
    pub buf_id: RemoteId,
    pub handle_id: RemoteId,
    pub len: u64,
}

/// A sysobject node.
pub struct ObjectEntry<O> {
    pub object_id: RemoteId,
    /// Token or handle whose teardown destroys this node.
    pub owner: RemoteId,
    /// Node this one was looked up from, if any.
    pub parent: Option<RemoteId>,
    pub native: Mutex<Option<O>>,
}

impl<O> ObjectEntry<O> {
    pub fn new(object_id: RemoteId, owner: RemoteId, parent: Option<RemoteId>, native: O) -> Self {
        Self {
            object_id,
            owner,
            parent,
            native: Mutex::new(Some(native)),
        }
    }
}
