//! # weft-mesh
//!
//! Authoring-side data consumed by the solver at setup time.
//!
//! ## Key Types
//!
//! - [`ClothMesh`] — vertex positions plus triangle/quad faces (faces are
//!   only needed for wind; hair meshes have none).
//! - [`Spring`] / [`SpringKind`] — the closed set of spring variants, each
//!   carrying its own vertex references.
//! - [`SpringTopology`] — edge adjacency used to derive structural, shear
//!   and bending springs from faces.
//! - Procedural generators for cloth grids and hair strands.

pub mod generators;
pub mod mesh;
pub mod spring;
pub mod topology;

pub use mesh::{ClothMesh, Face};
pub use spring::{average_rest_length, Spring, SpringKind};
pub use topology::{SpringOptions, SpringTopology};
