//! # weft-solver
//!
//! Implicit mass-spring dynamics for cloth and hair.
//!
//! ## Key Types
//!
//! - [`ClothSolver`] — per-object driver running the substep loop
//! - [`ImplicitSolver`] — backward-Euler system: forces, Jacobians, constraints, solve
//! - [`LinearSolver`] — pluggable linear solve (filtered CG, sparse Cholesky)
//! - [`SimSettings`] — simulation parameters, loadable from TOML
//! - [`FrameDiagnostics`] — per-frame aggregate of substep results

pub mod config;
pub mod constraint;
pub mod driver;
pub mod external;
pub mod forces;
pub mod implicit;
pub mod result;
pub mod state;
pub mod strategy;

pub use config::{CollisionSettings, LinearSolverKind, LinearSolverSettings, SimSettings, VolumeSettings};
pub use constraint::VelocityConstraint;
pub use driver::{ClothSolver, SolveContext};
pub use external::{ForceField, ForceSample, UniformWind, VelocityGrid, VolumeField};
pub use implicit::{ImplicitSolver, SolverPhase};
pub use result::{FrameDiagnostics, SolverResult, SolverStatus};
pub use state::{ClothVertex, SolverIndexMap, VertexFlags};
pub use strategy::{CholeskySolver, ConjugateGradientSolver, LinearSolver};
