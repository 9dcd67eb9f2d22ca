//! # weft-telemetry
//!
//! Structured solver telemetry. The time-stepping driver emits one event
//! per frame boundary, per solved substep and per contact pass; sinks
//! decide what to do with them.

pub mod bus;
pub mod events;
pub mod sinks;

pub use bus::EventBus;
pub use events::{EventKind, SimulationEvent};
pub use sinks::{EventSink, TracingSink, VecSink};
