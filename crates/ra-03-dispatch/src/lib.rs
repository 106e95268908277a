//! # Remote Dispatch
//!
//! The agent side of remote accelerator access. A `RemoteContext` owns the
//! registries of one session; for each request it decodes, resolves every
//! remote identity, calls the local `DeviceDriver`, commits identity
//! changes and encodes the response.
//!
//! ## Architecture
//!
//! - **Domain Layer:** resource state stored in the registries, serial
//!   tracking
//! - **Ports Layer:** the `DeviceDriver` trait
//! - **Handlers:** one function per operation on `RemoteContext`
//! - **Adapters Layer:** `SimulatedDriver`, an in-memory accelerator farm
//!
//! ## Semantics
//!
//! - Unknown identity: `NotFound`, no driver call.
//! - Region not mapped, or child identity owned by another handle:
//!   `InvalidParam`.
//! - Close cascades to the handle's regions, buffers and sysobjects.
//! - Destroying a token cascades to its sysobjects only.
//! - Driver failures pass through verbatim.

pub mod adapters;
pub mod context;
pub mod domain;
pub mod error;
mod handlers;
pub mod ports;


pub use adapters::{Outstanding, SimulatedDriver, MAX_SIM_DEVICES, OPEN_SHARED};
pub use context::{ContextRegistry, DispatchOutcome, RemoteContext};
pub use domain::{SerialObservation, SerialTracker};
pub use error::DispatchError;
pub use ports::DeviceDriver;
