//! State snapshot serialization for replay and debugging.
//!
//! Snapshots capture the motion state of every authoring vertex at the
//! end of a frame. Two runs from the same input produce identical bytes.

use serde::{Deserialize, Serialize};
use weft_math::Vec3;
use weft_types::{WeftError, WeftResult};

/// Motion state of all vertices at a frame boundary.
///
/// Serialized with `bincode` for compact binary output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Frame index when this snapshot was taken.
    pub frame: u32,
    /// Accumulated simulation time.
    pub time: f64,
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
}

impl StateSnapshot {
    /// Creates a snapshot from position and velocity buffers of equal length.
    pub fn from_motion(frame: u32, time: f64, positions: &[Vec3], velocities: &[Vec3]) -> Self {
        Self {
            frame,
            time,
            positions: positions.to_vec(),
            velocities: velocities.to_vec(),
        }
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Largest per-vertex position distance to `other`, or `None` if the
    /// vertex counts differ.
    pub fn max_position_delta(&self, other: &StateSnapshot) -> Option<f32> {
        (self.vertex_count() == other.vertex_count()).then(|| {
            self.positions
                .iter()
                .zip(&other.positions)
                .map(|(a, b)| a.distance(*b))
                .fold(0.0, f32::max)
        })
    }

    /// Serializes to compact binary format.
    pub fn to_bytes(&self) -> WeftResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| WeftError::Serialization(e.to_string()))
    }

    /// Deserializes from binary format.
    pub fn from_bytes(data: &[u8]) -> WeftResult<Self> {
        bincode::deserialize(data).map_err(|e| WeftError::Serialization(e.to_string()))
    }
}
