//! # Remote ID Registry
//!
//! Agent-side source of truth for "is this remote identity currently
//! valid". Every dispatched operation resolves its identities here before
//! the device is touched.
//!
//! ## Guarantees
//!
//! - Keys are unique per kind; a colliding insert fails and never
//!   overwrites.
//! - An unknown identity is an ordinary `RegistryError::NotFound`.
//! - Operations on one kind are mutually exclusive; different kinds
//!   proceed independently.

pub mod error;
pub mod generator;
pub mod registry;

pub use error::{RegistryError, RegistryKind};
pub use generator::RemoteIdGenerator;
pub use registry::{Registry, RemoteRegistry};
