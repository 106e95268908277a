//! Proxy graph domain: arena storage, node types, graph operations.

pub mod arena;
pub mod graph;
pub mod nodes;

pub use arena::{Arena, Key};
pub use graph::ProxyGraph;
pub use nodes::*;
