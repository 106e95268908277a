//! Adapters layer: concrete device drivers.

pub mod simulated;

pub use simulated::{Outstanding, SimulatedDriver, MAX_SIM_DEVICES, OPEN_SHARED};
