//! Analytical sphere collision.

use weft_math::Vec3;
use weft_types::VertexId;

use crate::contact::Contact;
use crate::provider::ContactProvider;

/// Analytical sphere collider, optionally translating at constant velocity.
///
/// Generates a contact for every vertex whose predicted position lies
/// within `margin` of the surface.
pub struct SphereCollider {
    /// Center of the sphere at the start of the substep.
    pub center: Vec3,
    /// Radius of the sphere.
    pub radius: f32,
    /// Contact band thickness.
    pub margin: f32,
    /// Linear velocity of the sphere.
    pub velocity: Vec3,
}

impl SphereCollider {
    /// Creates a new static sphere collider.
    pub fn new(center: Vec3, radius: f32, margin: f32) -> Self {
        Self {
            center,
            radius,
            margin,
            velocity: Vec3::ZERO,
        }
    }

    /// Sets the sphere's linear velocity.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }
}

impl ContactProvider for SphereCollider {
    fn find_contacts(&self, positions: &[Vec3], velocities: &[Vec3], dt: f32) -> Vec<Contact> {
        let center = self.center + self.velocity * dt;

        positions
            .iter()
            .zip(velocities)
            .enumerate()
            .filter_map(|(i, (x, v))| {
                let offset = *x + *v * dt - center;
                let dist = offset.length();
                let distance = dist - self.radius;
                if distance >= self.margin {
                    return None;
                }
                // Exactly at the center: push up.
                let normal = if dist > 1e-6 { offset / dist } else { Vec3::Z };
                Some(Contact {
                    vertex: VertexId(i as u32),
                    normal,
                    distance,
                    margin: self.margin,
                    collider_velocity_before: self.velocity,
                    collider_velocity_after: self.velocity,
                })
            })
            .collect()
    }

    fn name(&self) -> &str {
        "sphere_collider"
    }
}
