//! Collision response.
//!
//! Converts a contact into the velocity impulse that becomes a directional
//! velocity constraint. The rule blends a restitution bounce with a
//! repulsion velocity that resolves the penetration in one substep
//! (Choe et al. 2005).

use weft_math::Vec3;
use weft_types::constants::ALMOST_ZERO;

use crate::contact::Contact;

/// Upper bound on repulsion, as a multiple of the bounce velocity.
const REPULSE_BOUNCE_LIMIT: f32 = 4.0;

/// Computes the velocity impulse for a vertex moving at `point_velocity`.
///
/// Returns `None` if the vertex is outside the margin band or is not
/// approaching the collider. The returned impulse is along the contact
/// normal and makes the post-impulse normal velocity, relative to the
/// collider, equal to the chosen separation velocity (never negative).
pub fn collision_response(
    contact: &Contact,
    point_velocity: Vec3,
    dt: f32,
    restitution: f32,
) -> Option<Vec3> {
    let margin_distance = contact.margin_distance();
    if margin_distance >= 0.0 {
        return None;
    }

    let normal = contact.normal;
    let rel_old = point_velocity - contact.collider_velocity_before;
    let rel_new = point_velocity - contact.collider_velocity_after;

    let v_nor_old = rel_old.dot(normal);
    if v_nor_old >= -ALMOST_ZERO {
        return None;
    }
    let v_nor_new = rel_new.dot(normal);

    let bounce = -v_nor_old * restitution;
    let repulse = if dt > 0.0 { -margin_distance / dt } else { 0.0 };
    let repulse = repulse.min(REPULSE_BOUNCE_LIMIT * bounce).max(0.0);

    // Shallow contacts only repulse; bounce applies past the margin.
    let target = if margin_distance < -contact.margin {
        repulse.max(bounce)
    } else {
        repulse
    };

    Some(normal * (target - v_nor_new))
}
