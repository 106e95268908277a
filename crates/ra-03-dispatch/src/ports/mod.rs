//! Ports layer: the agent's dependency on the local device.

pub mod driver;

pub use driver::DeviceDriver;
