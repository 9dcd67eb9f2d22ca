//! Velocity constraints.
//!
//! A constraint fixes some directions of a vertex's velocity change.
//! The solver sees it as a filter `S`, the orthogonal projector onto the
//! free directions, plus a target `z` for the constrained part.

use weft_math::mat3::outer;
use weft_math::{Mat3, Vec3};

/// Constraint on one vertex for the current substep.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum VelocityConstraint {
    #[default]
    Free,
    /// All three directions fixed; `dv` is the prescribed velocity change.
    Fixed { dv: Vec3 },
    /// Two orthonormal directions fixed, motion along the remaining one.
    Planar { n1: Vec3, n2: Vec3, dv: Vec3 },
    /// Motion along `normal` prescribed by `impulse`; tangent plane free.
    Directional { normal: Vec3, impulse: Vec3 },
}

impl VelocityConstraint {
    /// Filter matrix `S`.
    pub fn filter(&self) -> Mat3 {
        match *self {
            VelocityConstraint::Free => Mat3::IDENTITY,
            VelocityConstraint::Fixed { .. } => Mat3::ZERO,
            VelocityConstraint::Planar { n1, n2, .. } => {
                Mat3::IDENTITY - outer(n1, n1) - outer(n2, n2)
            }
            VelocityConstraint::Directional { normal, .. } => Mat3::IDENTITY - outer(normal, normal),
        }
    }

    /// Target velocity change `z`.
    pub fn target(&self) -> Vec3 {
        match *self {
            VelocityConstraint::Free => Vec3::ZERO,
            VelocityConstraint::Fixed { dv } | VelocityConstraint::Planar { dv, .. } => dv,
            VelocityConstraint::Directional { impulse, .. } => impulse,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, VelocityConstraint::Free)
    }

    /// Number of removed degrees of freedom.
    pub fn removed_dofs(&self) -> u32 {
        match self {
            VelocityConstraint::Free => 0,
            VelocityConstraint::Directional { .. } => 1,
            VelocityConstraint::Planar { .. } => 2,
            VelocityConstraint::Fixed { .. } => 3,
        }
    }
}
