//! Linear solve strategies for the implicit step.
//!
//! The integrator assembles `A Δv = b` together with per-vertex filters
//! `S` and targets `z`; a [`LinearSolver`] produces `Δv`.
//!
//! # Implementations
//!
//! - [`ConjugateGradientSolver`] — filtered CG, the default
//! - [`CholeskySolver`] — sparse LLᵀ of the projected system via `faer`

use weft_math::cg::{solve_filtered, CgSettings};
use weft_math::faer_solver::FaerSolver;
use weft_math::sparse::SparseSolver;
use weft_math::{BlockMatrix, Mat3, Vec3};

use crate::config::{LinearSolverKind, LinearSolverSettings};
use crate::result::{SolverResult, SolverStatus};

/// Solves the constrained system for the velocity change.
pub trait LinearSolver: Send {
    /// Writes the solution into `dv`, also when the result is degraded.
    fn solve(&mut self, a: &BlockMatrix, b: &[Vec3], s: &[Mat3], z: &[Vec3], dv: &mut [Vec3]) -> SolverResult;

    /// Returns the strategy name.
    fn name(&self) -> &str;
}

/// Builds the strategy selected in the settings.
pub fn from_settings(settings: &LinearSolverSettings) -> Box<dyn LinearSolver> {
    match settings.kind {
        LinearSolverKind::ConjugateGradient => Box::new(ConjugateGradientSolver::new(
            settings.max_iterations,
            settings.tolerance,
        )),
        LinearSolverKind::Cholesky => Box::new(CholeskySolver::new()),
    }
}

/// Modified conjugate gradient of Baraff & Witkin.
pub struct ConjugateGradientSolver {
    settings: CgSettings,
}

impl ConjugateGradientSolver {
    pub fn new(max_iterations: u32, tolerance: f32) -> Self {
        Self {
            settings: CgSettings {
                max_iterations,
                tolerance,
            },
        }
    }
}

impl Default for ConjugateGradientSolver {
    fn default() -> Self {
        let defaults = LinearSolverSettings::default();
        Self::new(defaults.max_iterations, defaults.tolerance)
    }
}

impl LinearSolver for ConjugateGradientSolver {
    fn solve(&mut self, a: &BlockMatrix, b: &[Vec3], s: &[Mat3], z: &[Vec3], dv: &mut [Vec3]) -> SolverResult {
        let outcome = solve_filtered(a, b, s, z, dv, &self.settings);

        let status = if outcome.breakdown {
            SolverStatus::NUMERICAL_ISSUE
        } else if outcome.converged {
            SolverStatus::SUCCESS
        } else {
            SolverStatus::NO_CONVERGENCE
        };
        SolverResult::new(status, outcome.iterations, outcome.error)
    }

    fn name(&self) -> &str {
        "conjugate_gradient"
    }
}

/// Direct solve of `(S A S + I - S) y = S (b - A z)`, `Δv = z + y`.
///
/// Refactorizes every call since `A` changes every substep.
pub struct CholeskySolver {
    factor: FaerSolver,
}

impl CholeskySolver {
    pub fn new() -> Self {
        Self {
            factor: FaerSolver::new(),
        }
    }
}

impl Default for CholeskySolver {
    fn default() -> Self {
        Self::new()
    }
}

fn flatten(v: &[Vec3]) -> Vec<f32> {
    v.iter().flat_map(|p| p.to_array()).collect()
}

impl LinearSolver for CholeskySolver {
    fn solve(&mut self, a: &BlockMatrix, b: &[Vec3], s: &[Mat3], z: &[Vec3], dv: &mut [Vec3]) -> SolverResult {
        let n = a.vertex_count();
        dv.copy_from_slice(z);

        // rhs = S (b - A z)
        let mut az = vec![Vec3::ZERO; n];
        a.mul_vec(z, &mut az);
        let rhs: Vec<Vec3> = b
            .iter()
            .zip(&az)
            .zip(s)
            .map(|((bi, ai), si)| *si * (*bi - *ai))
            .collect();

        let projected = a.projected(s).to_csr();
        if let Err(e) = self.factor.factorize(&projected) {
            tracing::warn!(error = %e, "cholesky factorization failed");
            return SolverResult::new(SolverStatus::NUMERICAL_ISSUE, 0, 0.0);
        }

        let mut y = vec![0.0f32; 3 * n];
        if let Err(e) = self.factor.solve(&flatten(&rhs), &mut y) {
            tracing::warn!(error = %e, "cholesky back-substitution failed");
            return SolverResult::new(SolverStatus::NUMERICAL_ISSUE, 0, 0.0);
        }
        for (i, d) in dv.iter_mut().enumerate() {
            *d += Vec3::new(y[3 * i], y[3 * i + 1], y[3 * i + 2]);
        }
        if dv.iter().any(|d| !d.is_finite()) {
            return SolverResult::new(SolverStatus::NUMERICAL_ISSUE, 1, 0.0);
        }

        // Relative residual |S (b - A Δv)| / |S b|, as reported by CG.
        let mut adv = vec![Vec3::ZERO; n];
        a.mul_vec(dv, &mut adv);
        let (mut r2, mut b2) = (0.0f64, 0.0f64);
        for i in 0..n {
            let r = s[i] * (b[i] - adv[i]);
            let sb = s[i] * b[i];
            r2 += r.length_squared() as f64;
            b2 += sb.length_squared() as f64;
        }
        let error = if b2 > 0.0 { (r2 / b2).sqrt() as f32 } else { 0.0 };

        SolverResult::new(SolverStatus::SUCCESS, 1, error)
    }

    fn name(&self) -> &str {
        "cholesky"
    }
}
