//! Scalar type alias for the simulation.
//!
//! The solver works in single precision, matching the authoring data it
//! is fed with. The direct solve path widens to `f64` internally.

/// The floating-point type used throughout the simulation.
pub type Scalar = f32;
