//! # weft-contact
//!
//! Contact input and collision response for the implicit solver.
//!
//! Detection is a collaborator: a [`ContactProvider`] turns the current
//! motion state into a list of [`Contact`] records once per substep. The
//! solver feeds each contact through [`collision_response`], which yields
//! the velocity impulse used as a directional velocity constraint.
//!
//! Bundled providers are analytic ([`GroundPlane`], [`SphereCollider`]);
//! mesh colliders plug in through the same trait.

pub mod contact;
pub mod ground_plane;
pub mod provider;
pub mod response;
pub mod sphere;

pub use contact::Contact;
pub use ground_plane::GroundPlane;
pub use provider::{ContactProvider, NullContactProvider};
pub use response::collision_response;
pub use sphere::SphereCollider;
