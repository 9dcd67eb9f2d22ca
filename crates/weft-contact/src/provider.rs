//! Contact detection collaborator.

use weft_math::Vec3;

use crate::contact::Contact;

/// Produces the contact list for one substep.
///
/// `positions` and `velocities` are indexed by authoring vertex and hold
/// the state at the start of the substep.
///
/// # Implementations
/// - [`NullContactProvider`] — no colliders
/// - [`GroundPlane`](crate::GroundPlane) — horizontal plane
/// - [`SphereCollider`](crate::SphereCollider) — analytic sphere
pub trait ContactProvider {
    fn find_contacts(&self, positions: &[Vec3], velocities: &[Vec3], dt: f32) -> Vec<Contact>;

    /// Returns the provider name.
    fn name(&self) -> &str;
}

/// No-op provider for collision-free scenarios.
pub struct NullContactProvider;

impl ContactProvider for NullContactProvider {
    fn find_contacts(&self, _positions: &[Vec3], _velocities: &[Vec3], _dt: f32) -> Vec<Contact> {
        Vec::new()
    }

    fn name(&self) -> &str {
        "null_contact_provider"
    }
}
