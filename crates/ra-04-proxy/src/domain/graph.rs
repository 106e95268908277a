//! # Proxy Graph
//!
//! All proxies of one client, stored per kind in generation-checked
//! arenas. Removal mirrors the agent's teardown rules: removing a handle
//! drops its mappings, buffers and sysobjects; removing a token drops only
//! the sysobjects it owns.

use super::arena::Arena;
use super::nodes::*;
use shared_types::{HandleHeader, Properties, RemoteId};

#[derive(Default)]
pub struct ProxyGraph {
    tokens: Arena<TokenProxy>,
    handles: Arena<HandleProxy>,
    mmios: Arena<MmioProxy>,
    buffers: Arena<BufferProxy>,
    objects: Arena<SysobjectProxy>,
}

impl ProxyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self, key: Token) -> Option<&TokenProxy> {
        self.tokens.get(key)
    }

    pub fn handle(&self, key: Handle) -> Option<&HandleProxy> {
        self.handles.get(key)
    }

    pub fn mmio(&self, key: Mmio) -> Option<&MmioProxy> {
        self.mmios.get(key)
    }

    pub fn buffer(&self, key: Buffer) -> Option<&BufferProxy> {
        self.buffers.get(key)
    }

    pub fn object(&self, key: Sysobject) -> Option<&SysobjectProxy> {
        self.objects.get(key)
    }

    pub fn set_properties(&mut self, key: Token, properties: Properties) {
        if let Some(token) = self.tokens.get_mut(key) {
            token.properties = properties;
        }
    }

    // =========================================================================
    // CREATION
    // =========================================================================

    pub fn insert_token(&mut self, remote_id: RemoteId, properties: Properties) -> Token {
        self.tokens.insert(TokenProxy {
            remote_id,
            properties,
            indeterminate: false,
        })
    }

    /// `None` when `token` was released while the open was in flight.
    pub fn insert_handle(&mut self, token: Token, header: HandleHeader) -> Option<Handle> {
        if !self.tokens.contains(token) {
            return None;
        }
        Some(self.handles.insert(HandleProxy {
            remote_id: header.handle_id,
            token,
            token_id: header.token_id,
            flags: header.flags,
            indeterminate: false,
        }))
    }

    /// Returns the existing proxy when the agent answered with an identity
    /// this handle already maps.
    pub fn insert_mmio(&mut self, handle: Handle, mmio_num: u32, remote_id: RemoteId) -> Option<Mmio> {
        if !self.handles.contains(handle) {
            return None;
        }
        if let Some(existing) = self
            .mmios
            .keys_where(|m| m.handle == handle && m.remote_id == remote_id)
            .first()
        {
            return Some(*existing);
        }
        Some(self.mmios.insert(MmioProxy {
            remote_id,
            handle,
            mmio_num,
            indeterminate: false,
        }))
    }

    pub fn insert_buffer(
        &mut self,
        handle: Handle,
        remote_id: RemoteId,
        len: u64,
        pre_allocated_addr: Option<u64>,
    ) -> Option<Buffer> {
        if !self.handles.contains(handle) {
            return None;
        }
        Some(self.buffers.insert(BufferProxy {
            remote_id,
            handle,
            len,
            pre_allocated_addr,
            indeterminate: false,
        }))
    }

    /// `None` when the owner or the parent was released meanwhile.
    pub fn insert_object(
        &mut self,
        owner: ObjectOwner,
        parent: Option<Sysobject>,
        remote_id: RemoteId,
    ) -> Option<Sysobject> {
        let owner_live = match owner {
            ObjectOwner::Token(token) => self.tokens.contains(token),
            ObjectOwner::Handle(handle) => self.handles.contains(handle),
        };
        let parent_live = parent.map_or(true, |p| self.objects.contains(p));
        if !owner_live || !parent_live {
            return None;
        }
        Some(self.objects.insert(SysobjectProxy {
            remote_id,
            owner,
            parent,
            indeterminate: false,
        }))
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    pub fn find_mmio(&self, handle: Handle, mmio_num: u32) -> Option<Mmio> {
        self.mmios
            .keys_where(|m| m.handle == handle && m.mmio_num == mmio_num)
            .first()
            .copied()
    }

    pub fn mmios_of(&self, handle: Handle) -> Vec<Mmio> {
        self.mmios.keys_where(|m| m.handle == handle)
    }

    pub fn buffers_of(&self, handle: Handle) -> Vec<Buffer> {
        self.buffers.keys_where(|b| b.handle == handle)
    }

    pub fn objects_of(&self, owner: ObjectOwner) -> Vec<Sysobject> {
        self.objects.keys_where(|o| o.owner == owner)
    }

    /// Token a handle was opened from, if that token proxy is still live.
    pub fn token_of(&self, handle: Handle) -> Option<Token> {
        let token = self.handles.get(handle)?.token;
        self.tokens.contains(token).then_some(token)
    }

    // =========================================================================
    // REMOVAL
    // =========================================================================

    /// Removes a token and the sysobjects it owns. Handles opened from it
    /// stay.
    pub fn remove_token(&mut self, key: Token) -> Option<TokenProxy> {
        let token = self.tokens.remove(key)?;
        for object in self.objects_of(ObjectOwner::Token(key)) {
            self.objects.remove(object);
        }
        Some(token)
    }

    /// Removes a handle with every mapping, buffer and sysobject under it.
    pub fn remove_handle(&mut self, key: Handle) -> Option<HandleProxy> {
        let handle = self.handles.remove(key)?;
        for mmio in self.mmios_of(key) {
            self.mmios.remove(mmio);
        }
        for buffer in self.buffers_of(key) {
            self.buffers.remove(buffer);
        }
        for object in self.objects_of(ObjectOwner::Handle(key)) {
            self.objects.remove(object);
        }
        Some(handle)
    }

    pub fn remove_mmio(&mut self, key: Mmio) -> Option<MmioProxy> {
        self.mmios.remove(key)
    }

    pub fn remove_buffer(&mut self, key: Buffer) -> Option<BufferProxy> {
        self.buffers.remove(key)
    }

    pub fn remove_object(&mut self, key: Sysobject) -> Option<SysobjectProxy> {
        self.objects.remove(key)
    }

    /// Drops every proxy. Used once the agent reports the session gone.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.buffers.clear();
        self.mmios.clear();
        self.handles.clear();
        self.tokens.clear();
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
            + self.handles.len()
            + self.mmios.len()
            + self.buffers.len()
            + self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // INDETERMINATE STATE
    // =========================================================================

    /// Returns `false` when `target` is stale.
    pub fn set_indeterminate(&mut self, target: ProxyRef, value: bool) -> bool {
        let flag = match target {
            ProxyRef::Token(k) => self.tokens.get_mut(k).map(|p| &mut p.indeterminate),
            ProxyRef::Handle(k) => self.handles.get_mut(k).map(|p| &mut p.indeterminate),
            ProxyRef::Mmio(k) => self.mmios.get_mut(k).map(|p| &mut p.indeterminate),
            ProxyRef::Buffer(k) => self.buffers.get_mut(k).map(|p| &mut p.indeterminate),
            ProxyRef::Sysobject(k) => self.objects.get_mut(k).map(|p| &mut p.indeterminate),
        };
        match flag {
            Some(flag) => {
                *flag = value;
                true
            }
            None => false,
        }
    }

    /// `None` when `target` is stale.
    pub fn is_indeterminate(&self, target: ProxyRef) -> Option<bool> {
        match target {
            ProxyRef::Token(k) => self.tokens.get(k).map(|p| p.indeterminate),
            ProxyRef::Handle(k) => self.handles.get(k).map(|p| p.indeterminate),
            ProxyRef::Mmio(k) => self.mmios.get(k).map(|p| p.indeterminate),
            ProxyRef::Buffer(k) => self.buffers.get(k).map(|p| p.indeterminate),
            ProxyRef::Sysobject(k) => self.objects.get(k).map(|p| p.indeterminate),
        }
    }
}
