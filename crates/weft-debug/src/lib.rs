//! # weft-debug
//!
//! Inspection hooks, debug-visualization collection and state snapshots.
//! Nothing here is global: the driver receives hooks and collectors from
//! its caller and reports into them.

pub mod draw;
pub mod hooks;
pub mod snapshot;

pub use draw::{debug_hash, DebugCollector, DebugElement, DebugRecorder};
pub use hooks::{InspectionHook, TelemetryHook};
pub use snapshot::StateSnapshot;
