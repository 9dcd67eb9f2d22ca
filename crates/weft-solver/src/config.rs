//! Simulation settings.
//!
//! Every tunable of the mass-spring model lives here. Stiffness values are
//! authored per unit rest length and scaled by the average structural
//! spring length at solve time.

use serde::{Deserialize, Serialize};
use weft_types::constants::{DEFAULT_CG_MAX_ITERATIONS, DEFAULT_CG_TOLERANCE, DEFAULT_GRAVITY, DEFAULT_SUBSTEPS};
use weft_types::{WeftError, WeftResult};

/// Linear solve strategy used by the implicit integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LinearSolverKind {
    /// Filtered conjugate gradient.
    #[default]
    ConjugateGradient,
    /// Sparse Cholesky on the constraint-projected system.
    Cholesky,
}

/// Linear solve settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearSolverSettings {
    pub kind: LinearSolverKind,
    /// Iteration cap (iterative strategies only).
    pub max_iterations: u32,
    /// Relative residual tolerance.
    pub tolerance: f32,
}

impl Default for LinearSolverSettings {
    fn default() -> Self {
        Self {
            kind: LinearSolverKind::ConjugateGradient,
            max_iterations: DEFAULT_CG_MAX_ITERATIONS,
            tolerance: DEFAULT_CG_TOLERANCE,
        }
    }
}

/// Collision handling settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionSettings {
    /// Query the contact provider every substep.
    pub enabled: bool,
    /// Turn contacts into velocity constraints. When unset, contacts are
    /// only reported to hooks and debug collectors.
    pub point_contacts: bool,
    /// Normal restitution in [0, 1].
    pub restitution: f32,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            point_contacts: true,
            restitution: 0.0,
        }
    }
}

/// Volumetric (hair grid) interaction settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeSettings {
    /// Blend toward the grid velocity.
    pub velocity_smoothing: f32,
    /// Friction against colliders inside the grid.
    pub collider_friction: f32,
    /// Strength of the density-gradient pressure force.
    pub pressure: f32,
    /// Density below which no pressure is applied.
    pub pressure_threshold: f32,
    /// Grid cells per axis.
    pub voxel_resolution: u32,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            velocity_smoothing: 0.0,
            collider_friction: 0.0,
            pressure: 0.0,
            pressure_threshold: 0.0,
            voxel_resolution: 32,
        }
    }
}

impl VolumeSettings {
    /// True if the volume pass has any effect.
    pub fn is_active(&self) -> bool {
        self.velocity_smoothing > 0.0 || self.pressure > 0.0
    }
}

/// Configuration for the mass-spring simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Frame duration in solver time units.
    pub timescale: f32,
    /// Implicit substeps per frame.
    pub substeps: u32,
    /// Default vertex mass.
    pub mass: f32,

    /// Tension stiffness of structural, shear and sewing springs.
    pub structural: f32,
    /// Upper bound reached at spring stiffness factor 1.
    pub max_structural: f32,
    pub bending: f32,
    pub max_bending: f32,
    pub bending_damping: f32,
    /// Damping of distance springs (`Cdis`).
    pub spring_damping: f32,
    /// Air drag in percent (`Cvi`).
    pub air_drag: f32,
    /// Springs only act when stretched.
    pub no_compression: bool,
    /// Force clamp of sewing springs; `0` disables the clamp.
    pub max_sewing_force: f32,

    /// Enables goal springs and pinned-vertex velocities from goal targets.
    pub goal_enabled: bool,
    pub goal_spring: f32,
    /// Goal friction in percent.
    pub goal_friction: f32,

    /// Per-substep velocity multiplier; `1` disables it.
    pub velocity_damping: f32,

    pub gravity_enabled: bool,
    /// Scene gravity in m/s².
    pub gravity: [f32; 3],
    /// Weight of global gravity.
    pub effector_weight: f32,

    pub volume: VolumeSettings,
    pub collision: CollisionSettings,
    pub linear_solver: LinearSolverSettings,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            timescale: 1.0,
            substeps: DEFAULT_SUBSTEPS,
            mass: 0.3,
            structural: 15.0,
            max_structural: 15.0,
            bending: 0.5,
            max_bending: 0.5,
            bending_damping: 0.5,
            spring_damping: 5.0,
            air_drag: 1.0,
            no_compression: false,
            max_sewing_force: 0.0,
            goal_enabled: false,
            goal_spring: 1.0,
            goal_friction: 0.0,
            velocity_damping: 1.0,
            gravity_enabled: true,
            gravity: DEFAULT_GRAVITY,
            effector_weight: 1.0,
            volume: VolumeSettings::default(),
            collision: CollisionSettings::default(),
            linear_solver: LinearSolverSettings::default(),
        }
    }
}

impl SimSettings {
    /// Hair defaults: stiffer bending, goal-driven roots, volume smoothing.
    pub fn hair() -> Self {
        Self {
            mass: 0.05,
            structural: 50.0,
            max_structural: 50.0,
            bending: 5.0,
            max_bending: 5.0,
            bending_damping: 0.5,
            goal_enabled: true,
            volume: VolumeSettings {
                velocity_smoothing: 0.1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// More substeps and a tighter solve.
    pub fn high_quality() -> Self {
        Self {
            substeps: 15,
            linear_solver: LinearSolverSettings {
                kind: LinearSolverKind::ConjugateGradient,
                max_iterations: 400,
                tolerance: 1e-4,
            },
            ..Default::default()
        }
    }

    /// Substep length.
    pub fn dt(&self) -> f32 {
        self.timescale / self.substeps.max(1) as f32
    }

    /// Checks value ranges.
    pub fn validate(&self) -> WeftResult<()> {
        let invalid = |msg: String| Err(WeftError::InvalidConfig(msg));

        if !(self.timescale > 0.0) {
            return invalid(format!("timescale must be positive, got {}", self.timescale));
        }
        if self.substeps == 0 {
            return invalid("substeps must be at least 1".into());
        }
        if !(self.mass > 0.0) {
            return invalid(format!("vertex mass must be positive, got {}", self.mass));
        }
        if self.linear_solver.max_iterations == 0 {
            return invalid("linear solver iteration cap must be at least 1".into());
        }
        if !(self.linear_solver.tolerance > 0.0) {
            return invalid(format!(
                "linear solver tolerance must be positive, got {}",
                self.linear_solver.tolerance
            ));
        }
        if !(0.0..=1.0).contains(&self.collision.restitution) {
            return invalid(format!(
                "restitution must lie in [0, 1], got {}",
                self.collision.restitution
            ));
        }
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return invalid("gravity must be finite".into());
        }
        Ok(())
    }
}
