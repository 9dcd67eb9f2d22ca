//! Ground plane collision.
//!
//! A static collision object below which vertices may not move: the
//! plane `z = height` with normal `+Z`.

use weft_math::Vec3;
use weft_types::VertexId;

use crate::contact::Contact;
use crate::provider::ContactProvider;

/// Ground plane at a fixed Z height.
///
/// Distances are measured at the predicted end-of-substep position
/// `x + v·dt`, so approaching vertices are caught before they cross.
pub struct GroundPlane {
    /// Height of the ground plane (Z coordinate).
    pub height: f32,
    /// Contact band thickness.
    pub margin: f32,
}

impl GroundPlane {
    /// Creates a new ground plane at the given height.
    pub fn new(height: f32, margin: f32) -> Self {
        Self { height, margin }
    }
}

impl ContactProvider for GroundPlane {
    fn find_contacts(&self, positions: &[Vec3], velocities: &[Vec3], dt: f32) -> Vec<Contact> {
        positions
            .iter()
            .zip(velocities)
            .enumerate()
            .filter_map(|(i, (x, v))| {
                let distance = (x.z + v.z * dt) - self.height;
                (distance < self.margin)
                    .then(|| Contact::stationary(VertexId(i as u32), Vec3::Z, distance, self.margin))
            })
            .collect()
    }

    fn name(&self) -> &str {
        "ground_plane"
    }
}
