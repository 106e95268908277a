//! # Core Domain Entities
//!
//! Accelerator descriptions exchanged between client and agent.
//!
//! ## Clusters
//!
//! - **Discovery**: `Properties`, `Guid`, `ObjectType`, `AcceleratorState`
//! - **Resources**: `TokenHeader`, `HandleHeader`
//! - **Introspection**: `SysobjectType`, `ErrorInfo`

use crate::errors::TypeError;
use crate::{ErrorName, RemoteId};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// CLUSTER A: DISCOVERY
// =============================================================================

/// A 128-bit interface or function identifier.
///
/// Travels as 32 hex digits; dashes are accepted on input.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid(pub [u8; 16]);

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}

impl FromStr for Guid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| *c != '-').collect();
        let bytes = hex::decode(&compact).map_err(|_| TypeError::InvalidGuid(s.to_string()))?;
        let raw: [u8; 16] = bytes
            .try_into()
            .map_err(|_| TypeError::InvalidGuid(s.to_string()))?;
        Ok(Guid(raw))
    }
}

/// Whether a token describes a whole device or one accelerator on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Device,
    Accelerator,
}

/// Assignment state of an accelerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceleratorState {
    Assigned,
    Unassigned,
}

/// Discovery properties of an accelerator, also used as an enumeration filter.
///
/// Every field is optional. As a filter, an unset field matches anything.
/// Unset fields are omitted on the wire and default to unset when absent,
/// so adding a field here is a compatible change.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Properties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<RemoteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<ObjectType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<u16>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<Guid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_errors: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_slots: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbs_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerator_state: Option<AcceleratorState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_mmio: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_interrupts: Option<u32>,
}

impl Properties {
    /// Returns true if every field set in `self` has the same value in `other`.
    ///
    /// `parent` is a remote identity and is not compared.
    pub fn matches(&self, other: &Properties) -> bool {
        fn field<T: PartialEq>(filter: &Option<T>, value: &Option<T>) -> bool {
            filter.as_ref().map_or(true, |f| value.as_ref() == Some(f))
        }

        field(&self.object_type, &other.object_type)
            && field(&self.segment, &other.segment)
            && field(&self.bus, &other.bus)
            && field(&self.device, &other.device)
            && field(&self.function, &other.function)
            && field(&self.socket_id, &other.socket_id)
            && field(&self.vendor_id, &other.vendor_id)
            && field(&self.device_id, &other.device_id)
            && field(&self.guid, &other.guid)
            && field(&self.num_errors, &other.num_errors)
            && field(&self.num_slots, &other.num_slots)
            && field(&self.bbs_id, &other.bbs_id)
            && field(&self.accelerator_state, &other.accelerator_state)
            && field(&self.num_mmio, &other.num_mmio)
            && field(&self.num_interrupts, &other.num_interrupts)
    }
}

// =============================================================================
// CLUSTER B: RESOURCES
// =============================================================================

/// An enumerated accelerator as reported by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenHeader {
    pub token_id: RemoteId,
    /// Properties snapshot taken at enumeration time.
    #[serde(default)]
    pub properties: Properties,
}

/// An opened accelerator as reported by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HandleHeader {
    pub handle_id: RemoteId,
    /// Token the handle was opened from.
    pub token_id: RemoteId,
    pub flags: i32,
}

// =============================================================================
// CLUSTER C: INTROSPECTION
// =============================================================================

/// Kind of a sysobject node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SysobjectType {
    /// A container; children can be looked up by name or index.
    #[default]
    Container,
    /// A leaf holding a value.
    Attribute,
}

/// Description of one error register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub name: ErrorName,
    pub can_clear: bool,
}
