//! # Shared Types Crate
//!
//! Wire primitives used on both sides of the remote accelerator boundary.
//!
//! ## Design Principles
//!
//! - **Fixed-capacity strings**: every string that crosses the wire is a
//!   `BoundedStr<N>`; construction and decoding fail instead of truncating.
//! - **Identity is not capability**: a `RemoteId` names one live resource on
//!   the agent. The agent decides whether the resource's current state
//!   permits the requested operation.
//! - **Results travel in bodies**: every response carries a `ResultCode`;
//!   the header never implies success.

pub mod bounded;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod remote_id;
pub mod result;

pub use bounded::BoundedStr;
pub use entities::*;
pub use envelope::{RequestHeader, ResponseHeader, WireFormat};
pub use errors::TypeError;
pub use remote_id::RemoteId;
pub use result::{DriverResult, ResultCode};

/// Capacity of an operation name in a wire header (bytes).
pub const REQUEST_NAME_MAX: usize = 64;

/// Capacity of a host name (bytes).
pub const HOST_NAME_MAX: usize = 64;

/// Capacity of a sysobject name or path (bytes).
pub const SYSOBJECT_NAME_MAX: usize = 256;

/// Capacity of an error register name (bytes).
pub const ERROR_NAME_MAX: usize = 64;

/// Originator or resource-owning host.
pub type HostName = BoundedStr<HOST_NAME_MAX>;

/// Operation name carried in request and response headers.
pub type OpName = BoundedStr<REQUEST_NAME_MAX>;

/// Sysobject lookup name.
pub type SysobjectName = BoundedStr<SYSOBJECT_NAME_MAX>;

/// Error register name.
pub type ErrorName = BoundedStr<ERROR_NAME_MAX>;
