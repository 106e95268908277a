//! # Remote-Accel Test Suite
//!
//! Unified test crate for scenarios that cross crate boundaries: a
//! `RemoteClient` talking to a `RemoteContext` over a real transport.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs     # Agent/client setup shared by every scenario
//!     ├── sessions.rs     # Enumerate, open, MMIO, close and destroy flows
//!     ├── identity.rs     # Stale and unknown identities, registry races
//!     └── network.rs      # The same flows over the TCP transport
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p ra-tests
//!
//! # By category
//! cargo test -p ra-tests integration::sessions::
//! cargo test -p ra-tests integration::network::
//! ```

pub mod integration;
