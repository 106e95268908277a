//! Domain layer: per-resource state and request ordering.

pub mod serial;
pub mod state;

pub use serial::{SerialObservation, SerialTracker};
pub use state::{BufferEntry, HandleEntry, HandleSlot, MmioEntry, ObjectEntry, TokenEntry};
