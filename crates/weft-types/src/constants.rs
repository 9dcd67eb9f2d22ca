//! Numerical constants and simulation defaults.

/// Threshold below which lengths and relative velocities count as zero.
pub const ALMOST_ZERO: f32 = f32::EPSILON;

/// Default gravitational acceleration (m/s²), pointing down the Z axis.
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, 0.0, -9.81];

/// Scene gravity is given in m/s² while the solver integrates in frame time.
pub const GRAVITY_UNIT_SCALE: f32 = 0.001;

/// Air drag is authored in percent.
pub const DRAG_PERCENT_SCALE: f32 = 0.01;

/// Goal friction is authored in percent.
pub const GOAL_FRICTION_PERCENT_SCALE: f32 = 0.01;

/// Bending stiffness and damping are divided by this factor (Choi & Ko scaling).
pub const BENDING_STIFFNESS_DIVISOR: f32 = 20.0;

/// Default number of implicit substeps per frame.
pub const DEFAULT_SUBSTEPS: u32 = 5;

/// Iteration cap of the conjugate gradient solve.
pub const DEFAULT_CG_MAX_ITERATIONS: u32 = 100;

/// Relative residual tolerance of the conjugate gradient solve.
pub const DEFAULT_CG_TOLERANCE: f32 = 0.01;

/// Scale of wind forces distributed over faces.
pub const FACE_WIND_SCALE: f32 = 0.02;

/// Scale of wind forces distributed over hair segments.
pub const EDGE_WIND_SCALE: f32 = 0.01;

/// Step used for finite-difference Jacobians of the angular bending force.
pub const ANGULAR_FD_DELTA: f32 = 1.0e-3;
