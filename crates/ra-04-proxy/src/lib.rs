//! # Remote Proxy Graph
//!
//! The client side of remote accelerator access. Callers work with opaque,
//! copyable keys (`Token`, `Handle`, `Mmio`, `Buffer`, `Sysobject`); the
//! client maps each key to the remote identity the agent issued and keeps
//! the proxies arranged the way the agent arranges the resources.
//!
//! ## Architecture
//!
//! - **Domain Layer:** generation-checked `Arena`, proxy nodes, `ProxyGraph`
//! - **Ports Layer:** the `Transport` trait
//! - **Client:** `RemoteClient`, one method per remote operation
//!
//! ## Lifetime rules
//!
//! - A proxy exists only after a successful response created it.
//! - Keys are generation-checked; a key to a released proxy fails with
//!   `StaleProxy` and never reaches a reused slot.
//! - Closing a handle drops its mappings, buffers and sysobjects.
//! - Destroying a token drops only the sysobjects it owns; handles opened
//!   from it stay usable.

pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;


pub use client::{Enumeration, RemoteClient};
pub use config::ClientConfig;
pub use domain::{Buffer, Handle, Mmio, ObjectOwner, ProxyGraph, ProxyRef, Sysobject, Token};
pub use error::RemoteError;
pub use ports::{Transport, TransportError};
