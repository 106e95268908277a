//! # Per-Kind Registries
//!
//! Each kind of resource has its own map behind its own lock, so lookups on
//! different kinds never contend. State is handed out as `Arc<S>`: callers
//! resolve an identity, drop the map lock, and only then act on the state.
//! No caller holds a map lock while talking to the device.

use crate::error::{RegistryError, RegistryKind};
use parking_lot::RwLock;
use shared_types::RemoteId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

/// Map from remote identity to the state of one kind of resource.
#[derive(Debug)]
pub struct Registry<S> {
    kind: RegistryKind,
    entries: RwLock<HashMap<RemoteId, Arc<S>>>,
}

impl<S> Registry<S> {
    pub fn new(kind: RegistryKind) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> RegistryKind {
        self.kind
    }

    /// Registers `state` under `id`. An existing entry is never overwritten.
    pub fn insert(&self, id: RemoteId, state: S) -> Result<Arc<S>, RegistryError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&id) {
            error!(kind = %self.kind, remote_id = %id, "duplicate remote identity");
            return Err(RegistryError::Duplicate {
                kind: self.kind,
                id,
            });
        }
        let state = Arc::new(state);
        entries.insert(id, Arc::clone(&state));
        debug!(kind = %self.kind, remote_id = %id, "registered");
        Ok(state)
    }

    /// Resolves `id` to its current state.
    pub fn lookup(&self, id: &RemoteId) -> Result<Arc<S>, RegistryError> {
        self.entries
            .read()
            .get(id)
            .cloned()
            .ok_or(RegistryError::NotFound {
                kind: self.kind,
                id: *id,
            })
    }

    pub fn contains(&self, id: &RemoteId) -> bool {
        self.entries.read().contains_key(id)
    }

    /// Invalidates `id`, returning its state.
    pub fn remove(&self, id: &RemoteId) -> Result<Arc<S>, RegistryError> {
        let removed = self.entries.write().remove(id);
        match removed {
            Some(state) => {
                debug!(kind = %self.kind, remote_id = %id, "invalidated");
                Ok(state)
            }
            None => Err(RegistryError::NotFound {
                kind: self.kind,
                id: *id,
            }),
        }
    }

    /// Invalidates every entry whose state satisfies `pred`.
    pub fn remove_where<F>(&self, mut pred: F) -> Vec<(RemoteId, Arc<S>)>
    where
        F: FnMut(&S) -> bool,
    {
        let mut entries = self.entries.write();
        let ids: Vec<RemoteId> = entries
            .iter()
            .filter(|(_, state)| pred(state))
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter()
            .filter_map(|id| entries.remove(&id).map(|state| (id, state)))
            .collect()
    }

    /// Invalidates every entry.
    pub fn drain(&self) -> Vec<(RemoteId, Arc<S>)> {
        self.entries.write().drain().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// The five per-kind registries of one context.
#[derive(Debug)]
pub struct RemoteRegistry<T, H, M, B, O> {
    pub tokens: Registry<T>,
    pub handles: Registry<H>,
    pub mmios: Registry<M>,
    pub buffers: Registry<B>,
    pub objects: Registry<O>,
}

impl<T, H, M, B, O> RemoteRegistry<T, H, M, B, O> {
    pub fn new() -> Self {
        Self {
            tokens: Registry::new(RegistryKind::Token),
            handles: Registry::new(RegistryKind::Handle),
            mmios: Registry::new(RegistryKind::Mmio),
            buffers: Registry::new(RegistryKind::Buffer),
            objects: Registry::new(RegistryKind::Sysobject),
        }
    }

    /// Total number of live identities across all kinds.
    pub fn live_count(&self) -> usize {
        self.tokens.len()
            + self.handles.len()
            + self.mmios.len()
            + self.buffers.len()
            + self.objects.len()
    }
}

impl<T, H, M, B, O> Default for RemoteRegistry<T, H, M, B, O> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::RemoteIdGenerator;
    use shared_types::{HostName, ResultCode};
    use std::thread;

    fn gen() -> RemoteIdGenerator {
        RemoteIdGenerator::new(HostName::new("agent").unwrap())
    }

    #[test]
    fn test_insert_then_lookup() {
        let reg = Registry::new(RegistryKind::Token);
        let id = gen().next_id();
        reg.insert(id, "fpga0").unwrap();
        assert_eq!(*reg.lookup(&id).unwrap(), "fpga0");
    }

    #[test]
    fn test_duplicate_does_not_overwrite() {
        let reg = Registry::new(RegistryKind::Handle);
        let id = gen().next_id();
        reg.insert(id, 1).unwrap();
        let err = reg.insert(id, 2).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Duplicate {
                kind: RegistryKind::Handle,
                id
            }
        );
        assert_eq!(*reg.lookup(&id).unwrap(), 1);
    }

    #[test]
    fn test_unknown_identity_is_not_found() {
        let reg: Registry<u32> = Registry::new(RegistryKind::Mmio);
        let err = reg.lookup(&gen().next_id()).unwrap_err();
        assert_eq!(err.result_code(), ResultCode::NotFound);
    }

    #[test]
    fn test_remove_invalidates() {
        let reg = Registry::new(RegistryKind::Buffer);
        let id = gen().next_id();
        reg.insert(id, ()).unwrap();
        assert!(reg.remove(&id).is_ok());
        assert!(reg.lookup(&id).is_err());
        assert!(reg.remove(&id).is_err());
    }

    #[test]
    fn test_remove_where_selects_children() {
        let reg = Registry::new(RegistryKind::Mmio);
        let g = gen();
        let (a, b, c) = (g.next_id(), g.next_id(), g.next_id());
        reg.insert(a, "h1").unwrap();
        reg.insert(b, "h2").unwrap();
        reg.insert(c, "h1").unwrap();

        let mut removed: Vec<_> = reg
            .remove_where(|owner| *owner == "h1")
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        removed.sort_by_key(|id| id.unique_id);
        let mut expected = vec![a, c];
        expected.sort_by_key(|id| id.unique_id);
        assert_eq!(removed, expected);
        assert!(reg.contains(&b));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_kinds_are_independent() {
        let reg: RemoteRegistry<u8, u8, u8, u8, u8> = RemoteRegistry::new();
        let id = gen().next_id();
        reg.tokens.insert(id, 1).unwrap();
        // The same identity in another kind is a different entry.
        reg.handles.insert(id, 2).unwrap();
        assert!(reg.mmios.lookup(&id).is_err());
        assert_eq!(reg.live_count(), 2);
    }

    #[test]
    fn test_drain_empties() {
        let reg = Registry::new(RegistryKind::Sysobject);
        let g = gen();
        for i in 0..5 {
            reg.insert(g.next_id(), i).unwrap();
        }
        assert_eq!(reg.drain().len(), 5);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_concurrent_lookups_never_observe_foreign_state() {
        // Each id's state records the id it was inserted under. A lookup must
        // either miss or return exactly that state.
        let reg = Arc::new(Registry::new(RegistryKind::Handle));
        let host = HostName::new("agent").unwrap();
        let g = Arc::new(RemoteIdGenerator::with_seed(host, 0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                let g = Arc::clone(&g);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let id = g.next_id();
                        reg.insert(id, id).unwrap();
                        assert_eq!(*reg.lookup(&id).unwrap(), id);
                        let removed = reg.remove(&id).unwrap();
                        assert_eq!(*removed, id);
                        assert!(reg.lookup(&id).is_err());
                    }
                })
            })
            .collect();

        let reader = {
            let reg = Arc::clone(&reg);
            thread::spawn(move || {
                for i in 0..20_000u64 {
                    let wanted = RemoteId::new(host, i % 4000);
                    if let Ok(state) = reg.lookup(&wanted) {
                        assert_eq!(*state, wanted);
                    }
                }
            })
        };

        for w in workers {
            w.join().unwrap();
        }
        reader.join().unwrap();
        assert!(reg.is_empty());
    }
}
