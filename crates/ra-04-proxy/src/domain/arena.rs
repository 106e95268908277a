//! # Generation-Checked Arena
//!
//! Proxies live in slots addressed by `Key<T>` (index plus generation).
//! Removing a value bumps its slot's generation, so any key still naming
//! the old value fails every lookup instead of reaching whatever reuses
//! the slot. A slot whose generation is exhausted is retired, never reused.
//! Every arena has its own id, so a key from one arena never resolves in
//! another.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ARENA_ID: AtomicU64 = AtomicU64::new(1);

/// Typed, generation-checked reference into an `Arena<T>`.
pub struct Key<T> {
    arena: u64,
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    fn new(arena: u64, index: u32, generation: u32) -> Self {
        Self {
            arena,
            index,
            generation,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.arena == other.arena && self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Key<T> {}

impl<T> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.arena.hash(state);
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({}:{}v{})", self.arena, self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage with generation-checked keys.
pub struct Arena<T> {
    id: u64,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            id: NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> Key<T> {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Key::new(self.id, index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Key::new(self.id, index, 0)
    }

    pub fn get(&self, key: Key<T>) -> Option<&T> {
        if key.arena != self.id {
            return None;
        }
        self.slots
            .get(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, key: Key<T>) -> Option<&mut T> {
        if key.arena != self.id {
            return None;
        }
        self.slots
            .get_mut(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, key: Key<T>) -> bool {
        self.get(key).is_some()
    }

    /// Removes the value, invalidating every copy of `key`.
    pub fn remove(&mut self, key: Key<T>) -> Option<T> {
        if key.arena != self.id {
            return None;
        }
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let value = slot.value.take()?;
        // An exhausted slot stays off the free list for good.
        if let Some(next) = slot.generation.checked_add(1) {
            slot.generation = next;
            self.free.push(key.index);
        }
        self.len -= 1;
        Some(value)
    }

    /// Keys of every value satisfying `pred`.
    pub fn keys_where(&self, mut pred: impl FnMut(&T) -> bool) -> Vec<Key<T>> {
        self.iter()
            .filter(|(_, value)| pred(value))
            .map(|(key, _)| key)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (Key::new(self.id, index as u32, slot.generation), value))
        })
    }

    /// Removes every value, invalidating all outstanding keys.
    pub fn clear(&mut self) {
        for key in self.keys_where(|_| true) {
            self.remove(key);
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
