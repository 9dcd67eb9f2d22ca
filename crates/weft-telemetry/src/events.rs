//! Simulation event types.
//!
//! Events are plain values: the driver builds them from its per-substep
//! results and hands them to the bus.

use serde::{Deserialize, Serialize};

/// A simulation event tagged with the frame that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    /// Frame number (0-indexed).
    pub frame: u32,
    /// Event payload.
    pub kind: EventKind,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Frame started.
    FrameBegin {
        /// Frame duration in simulation time units.
        timescale: f32,
        /// Number of substeps the frame is split into.
        substeps: u32,
    },

    /// One substep's linear solve finished.
    SubstepSolved {
        substep: u32,
        /// Raw `SolverStatus` bits.
        status: u32,
        iterations: u32,
        /// Relative residual; meaningful only on success.
        error: f32,
    },

    /// Collision contacts were turned into velocity constraints.
    ContactsResolved {
        /// Contacts reported by the provider.
        contact_count: u32,
        /// Directional constraints actually added.
        constraint_count: u32,
    },

    /// Frame finished.
    FrameEnd {
        /// OR of all substep statuses.
        status: u32,
        avg_iterations: f32,
        /// Wall-clock time for the frame (seconds).
        wall_time: f64,
    },

    /// Custom event for extensibility.
    Custom {
        label: String,
        /// JSON-encoded payload.
        payload: String,
    },
}

impl SimulationEvent {
    /// Creates a new event for the given frame.
    pub fn new(frame: u32, kind: EventKind) -> Self {
        Self { frame, kind }
    }

    /// Short label for the payload variant.
    pub fn label(&self) -> &str {
        match &self.kind {
            EventKind::FrameBegin { .. } => "frame_begin",
            EventKind::SubstepSolved { .. } => "substep_solved",
            EventKind::ContactsResolved { .. } => "contacts_resolved",
            EventKind::FrameEnd { .. } => "frame_end",
            EventKind::Custom { label, .. } => label,
        }
    }
}
