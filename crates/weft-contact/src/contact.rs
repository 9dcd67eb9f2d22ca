//! Contact record.

use serde::{Deserialize, Serialize};
use weft_math::Vec3;
use weft_types::VertexId;

/// A detected proximity between a mesh vertex and a collider.
///
/// Velocities are the collider's surface velocity at the contact point
/// at the start and end of the substep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Authoring-mesh vertex in contact.
    pub vertex: VertexId,
    /// Unit contact normal pointing away from the collider.
    pub normal: Vec3,
    /// Signed distance to the collider surface (negative = penetrating).
    pub distance: f32,
    /// Collider skin thickness subtracted from `distance`.
    pub margin: f32,
    pub collider_velocity_before: Vec3,
    pub collider_velocity_after: Vec3,
}

impl Contact {
    /// Contact against a static collider.
    pub fn stationary(vertex: VertexId, normal: Vec3, distance: f32, margin: f32) -> Self {
        Self {
            vertex,
            normal,
            distance,
            margin,
            collider_velocity_before: Vec3::ZERO,
            collider_velocity_after: Vec3::ZERO,
        }
    }

    /// Distance with the collider margin taken off.
    #[inline]
    pub fn margin_distance(&self) -> f32 {
        self.distance - self.margin
    }

    /// Returns true if the vertex is inside the margin band.
    pub fn is_penetrating(&self) -> bool {
        self.margin_distance() < 0.0
    }

    /// Returns the penetration depth (positive if penetrating, zero otherwise).
    pub fn penetration_depth(&self) -> f32 {
        (-self.margin_distance()).max(0.0)
    }
}
