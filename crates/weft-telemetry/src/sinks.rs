//! Event sinks.

use std::sync::{Arc, Mutex};

use crate::events::{EventKind, SimulationEvent};

/// Trait for event consumers.
pub trait EventSink: Send {
    /// Process a single event.
    fn handle(&mut self, event: &SimulationEvent);

    /// Called once when the simulation ends.
    fn finalize(&mut self) {}

    /// Returns a human-readable name for this sink.
    fn name(&self) -> &str;
}

/// Collects events in memory.
///
/// Clones share the same buffer, so a handle kept by the caller sees
/// what the boxed copy inside the bus received.
#[derive(Clone, Default)]
pub struct VecSink {
    events: Arc<Mutex<Vec<SimulationEvent>>>,
}

impl VecSink {
    /// Creates an empty vec sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events received so far.
    pub fn events(&self) -> Vec<SimulationEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of events received so far.
    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for VecSink {
    fn handle(&mut self, event: &SimulationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }

    fn name(&self) -> &str {
        "vec_sink"
    }
}

/// Status bits of a clean substep (`SolverStatus::SUCCESS`).
const STATUS_SUCCESS: u32 = 1;

/// Forwards events to `tracing`.
///
/// Frames ending with a degraded status are logged at `warn`. A quiet
/// sink logs substep and contact events at `debug`; everything else goes
/// out at `info`.
pub struct TracingSink {
    verbose: bool,
}

impl TracingSink {
    /// Sink that logs every event at `info`.
    pub fn new() -> Self {
        Self { verbose: true }
    }

    /// Sink that logs substep events at `debug` only.
    pub fn quiet() -> Self {
        Self { verbose: false }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for TracingSink {
    fn handle(&mut self, event: &SimulationEvent) {
        match &event.kind {
            EventKind::FrameEnd { status, .. } if *status != STATUS_SUCCESS => {
                tracing::warn!(frame = event.frame, event = ?event.kind, "simulation_event");
            }
            EventKind::SubstepSolved { .. } | EventKind::ContactsResolved { .. }
                if !self.verbose =>
            {
                tracing::debug!(frame = event.frame, event = ?event.kind, "simulation_event");
            }
            _ => {
                tracing::info!(frame = event.frame, event = ?event.kind, "simulation_event");
            }
        }
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}
