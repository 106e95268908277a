//! # Identity Generator
//!
//! Mints `RemoteId`s for one host. Values start at a random seed and
//! advance by one per identity, so no value repeats until the 64-bit space
//! wraps, and identities from an earlier process are unlikely to collide
//! with fresh ones.

use shared_types::{HostName, RemoteId};
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of fresh remote identities.
#[derive(Debug)]
pub struct RemoteIdGenerator {
    hostname: HostName,
    seed: u64,
    counter: AtomicU64,
}

impl RemoteIdGenerator {
    /// Creates a generator with a random seed.
    pub fn new(hostname: HostName) -> Self {
        Self::with_seed(hostname, rand::random())
    }

    /// Creates a generator with a fixed seed.
    pub fn with_seed(hostname: HostName, seed: u64) -> Self {
        Self {
            hostname,
            seed,
            counter: AtomicU64::new(0),
        }
    }

    pub fn hostname(&self) -> HostName {
        self.hostname
    }

    /// Returns an identity never returned before by this generator.
    pub fn next_id(&self) -> RemoteId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        RemoteId::new(self.hostname, self.seed.wrapping_add(n))
    }
}
