//! # Remote-Accel Agent
//!
//! Wires the dispatcher to the outside world.
//!
//! ## Modules
//!
//! - `admin/` - axum router for `/health` and `/metrics`
//! - `config/` - `AgentConfig` from the environment
//! - `service/` - tokio TCP server, one `RemoteContext` per connection
//! - `loopback/` - in-process client transport
//! - `tcp/` - blocking TCP client transport
//!
//! ## Wire framing
//!
//! One JSON message per line in both directions. A request whose header
//! cannot be read, or a line longer than the frame limit, closes the
//! connection, releasing its context.

pub mod admin;
pub mod config;
mod framing;
pub mod loopback;
pub mod service;
pub mod tcp;

pub use admin::admin_router;
pub use config::{AgentConfig, ConfigError};
pub use loopback::LoopbackTransport;
pub use ra_03_dispatch::SimulatedDriver;
pub use service::{handle_line, AgentServer};
pub use tcp::TcpTransport;
