//! # Remote Identity
//!
//! A `RemoteId` names one live resource (token, handle, MMIO mapping, shared
//! buffer or sysobject) held by an agent. Two identities are equal exactly
//! when both the host name and the unique value match.

use crate::HostName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Globally unique handle for a resource owned by a remote agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RemoteId {
    /// Host that minted the identity.
    pub hostname: HostName,
    /// Value unique among identities minted by that host.
    pub unique_id: u64,
}

impl RemoteId {
    pub fn new(hostname: HostName, unique_id: u64) -> Self {
        Self {
            hostname,
            unique_id,
        }
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:016x}", self.hostname, self.unique_id)
    }
}
