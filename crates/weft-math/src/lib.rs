//! # weft-math
//!
//! Linear algebra primitives for the weft mass-spring solver.
//!
//! Provides:
//! - Re-exports of `glam` types (`Vec3`, `Mat3`)
//! - Small 3×3 helpers used by the force models
//! - Block-sparse matrix of 3×3 blocks (one diagonal block per vertex)
//! - Filtered conjugate gradient (Baraff & Witkin constraint filtering)
//! - Scalar CSR matrix and a sparse Cholesky solver backed by `faer`

pub mod block;
pub mod cg;
pub mod faer_solver;
pub mod mat3;
pub mod sparse;

pub use block::{BlockMatrix, OffDiagonalBlock};
pub use glam::{Mat3, Vec3};
