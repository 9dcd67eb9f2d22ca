//! Inspection hooks for live debugging.
//!
//! Hooks are injected into the time-stepping driver and called at fixed
//! points of every frame. They observe; they never change solver state.
//!
//! # Lifecycle
//!
//! ```text
//! for each frame:
//!   hook.on_frame_begin(...)
//!   for each substep:
//!     hook.on_contacts(...)
//!     hook.on_substep(...)
//!   hook.on_frame_end(...)
//! hook.on_simulation_end()
//! ```

use weft_telemetry::events::{EventKind, SimulationEvent};
use weft_telemetry::EventBus;

/// Trait for simulation inspection hooks.
pub trait InspectionHook: Send {
    fn on_frame_begin(&mut self, frame: u32, timescale: f32, substeps: u32) {
        let _ = (frame, timescale, substeps);
    }

    /// Called after each substep's contacts became constraints.
    fn on_contacts(&mut self, frame: u32, contact_count: u32, constraint_count: u32) {
        let _ = (frame, contact_count, constraint_count);
    }

    /// Called after each substep's linear solve. `status` holds raw status bits.
    fn on_substep(&mut self, frame: u32, substep: u32, status: u32, iterations: u32, error: f32) {
        let _ = (frame, substep, status, iterations, error);
    }

    fn on_frame_end(&mut self, frame: u32, status: u32, avg_iterations: f32, wall_time: f64) {
        let _ = (frame, status, avg_iterations, wall_time);
    }

    /// Called when the owning solver is freed.
    fn on_simulation_end(&mut self) {}

    /// Returns the hook's name for logging.
    fn name(&self) -> &str;
}

/// Hook that records lifecycle calls as telemetry events.
pub struct TelemetryHook {
    events: Vec<SimulationEvent>,
}

impl TelemetryHook {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Drains collected events.
    pub fn drain_events(&mut self) -> Vec<SimulationEvent> {
        std::mem::take(&mut self.events)
    }

    /// Moves collected events onto a bus.
    pub fn drain_into(&mut self, bus: &EventBus) {
        for event in self.events.drain(..) {
            bus.emit(event);
        }
    }

    fn push(&mut self, frame: u32, kind: EventKind) {
        self.events.push(SimulationEvent::new(frame, kind));
    }
}

impl Default for TelemetryHook {
    fn default() -> Self {
        Self::new()
    }
}

impl InspectionHook for TelemetryHook {
    fn on_frame_begin(&mut self, frame: u32, timescale: f32, substeps: u32) {
        self.push(frame, EventKind::FrameBegin { timescale, substeps });
    }

    fn on_contacts(&mut self, frame: u32, contact_count: u32, constraint_count: u32) {
        self.push(
            frame,
            EventKind::ContactsResolved {
                contact_count,
                constraint_count,
            },
        );
    }

    fn on_substep(&mut self, frame: u32, substep: u32, status: u32, iterations: u32, error: f32) {
        self.push(
            frame,
            EventKind::SubstepSolved {
                substep,
                status,
                iterations,
                error,
            },
        );
    }

    fn on_frame_end(&mut self, frame: u32, status: u32, avg_iterations: f32, wall_time: f64) {
        self.push(
            frame,
            EventKind::FrameEnd {
                status,
                avg_iterations,
                wall_time,
            },
        );
    }

    fn name(&self) -> &str {
        "telemetry_hook"
    }
}
