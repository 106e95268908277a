//! Ports the client depends on.

mod transport;

pub use transport::{Transport, TransportError};
