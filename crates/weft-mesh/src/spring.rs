//! Spring records.
//!
//! A spring is created once from topology and never mutated afterwards
//! except for its deactivation flag. Its force is recomputed every
//! substep by the solver.

use serde::{Deserialize, Serialize};
use weft_math::Vec3;

/// Spring variant together with the vertices it connects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpringKind {
    /// Distance spring along a mesh edge.
    Structural { ij: u32, kl: u32 },
    /// Distance spring across a quad diagonal.
    Shear { ij: u32, kl: u32 },
    /// Distance spring stitching two panels; its force is clamped.
    Sewing { ij: u32, kl: u32 },
    /// Pulls a single vertex toward its animated target.
    Goal { vertex: u32 },
    /// Distance-style curvature resistance between non-adjacent vertices.
    Bending { ij: u32, kl: u32 },
    /// Penalizes the angle between segments `ij–kl` and `kl–mn`.
    /// `target` is the rest direction of `kl–mn` in the rest frame of `kl`.
    BendingAngular { ij: u32, kl: u32, mn: u32, target: Vec3 },
}

/// A spring of the mass-spring system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spring {
    pub kind: SpringKind,
    /// Rest length (unused by goal and angular springs).
    pub rest_length: f32,
    /// Blend factor in [0, 1] between base and maximum stiffness.
    pub stiffness: f32,
    /// Externally switched off (e.g. torn); never evaluated.
    pub deactivated: bool,
}

impl Spring {
    /// Creates an active spring with full stiffness factor.
    pub fn new(kind: SpringKind, rest_length: f32) -> Self {
        Self {
            kind,
            rest_length,
            stiffness: 1.0,
            deactivated: false,
        }
    }

    /// Sets the stiffness factor, clamped to [0, 1].
    pub fn with_stiffness(mut self, stiffness: f32) -> Self {
        self.stiffness = stiffness.clamp(0.0, 1.0);
        self
    }

    /// Vertices referenced by the spring, in order.
    pub fn vertices(&self) -> impl Iterator<Item = u32> {
        let (v, n) = match self.kind {
            SpringKind::Structural { ij, kl }
            | SpringKind::Shear { ij, kl }
            | SpringKind::Sewing { ij, kl }
            | SpringKind::Bending { ij, kl } => ([ij, kl, 0], 2),
            SpringKind::Goal { vertex } => ([vertex, 0, 0], 1),
            SpringKind::BendingAngular { ij, kl, mn, .. } => ([ij, kl, mn], 3),
        };
        v.into_iter().take(n)
    }

    /// True if any referenced vertex satisfies `pred`.
    pub fn any_vertex(&self, pred: impl FnMut(u32) -> bool) -> bool {
        self.vertices().any(pred)
    }

    /// True if the spring references `vertex`.
    pub fn touches(&self, vertex: u32) -> bool {
        self.any_vertex(|v| v == vertex)
    }

    /// Number of off-diagonal system blocks the spring couples.
    pub fn off_diagonal_blocks(&self) -> usize {
        match self.kind {
            SpringKind::BendingAngular { .. } => 3,
            _ => 1,
        }
    }

    /// Structural, shear and sewing springs share one force model.
    pub fn is_stretch(&self) -> bool {
        matches!(
            self.kind,
            SpringKind::Structural { .. } | SpringKind::Shear { .. } | SpringKind::Sewing { .. }
        )
    }
}

/// Average rest length of structural springs.
///
/// Falls back to all distance springs when there are no structural ones,
/// and to `1.0` for an empty or zero-length set.
pub fn average_rest_length(springs: &[Spring]) -> f32 {
    let mean = |filter: &dyn Fn(&Spring) -> bool| {
        let (sum, count) = springs
            .iter()
            .filter(|s| filter(s))
            .fold((0.0f32, 0usize), |(sum, n), s| (sum + s.rest_length, n + 1));
        (count > 0 && sum > 0.0).then(|| sum / count as f32)
    };

    mean(&|s| matches!(s.kind, SpringKind::Structural { .. }))
        .or_else(|| mean(&|s| s.rest_length > 0.0))
        .unwrap_or(1.0)
}
