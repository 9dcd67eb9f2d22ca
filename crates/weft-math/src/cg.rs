//! Filtered conjugate gradient.
//!
//! Solves `A Δv = b` where some vertices carry velocity constraints.
//! Each vertex has a filter block `S` (an orthogonal projector onto its
//! free directions) and a target `z` for the constrained directions.
//! The iteration starts at `Δv = z` and keeps every search direction
//! filtered, so constrained components never move away from `z`.
//!
//! Reference: Baraff & Witkin, "Large Steps in Cloth Simulation",
//! SIGGRAPH 1998, section 5.3.

use glam::{Mat3, Vec3};

/// Termination settings of the iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CgSettings {
    /// Iteration cap.
    pub max_iterations: u32,
    /// Relative residual tolerance.
    pub tolerance: f32,
}

/// Outcome of a filtered CG solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CgOutcome {
    /// Iterations performed.
    pub iterations: u32,
    /// Relative residual norm `|r| / |S b|` at exit.
    pub error: f32,
    /// Residual tolerance was met.
    pub converged: bool,
    /// A division by (near) zero or a non-finite value stopped the iteration.
    pub breakdown: bool,
}

#[inline]
fn filter(v: &mut [Vec3], s: &[Mat3]) {
    for (vi, si) in v.iter_mut().zip(s) {
        *vi = *si * *vi;
    }
}

#[inline]
fn dot(a: &[Vec3], b: &[Vec3]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x.dot(*y) as f64).sum()
}

/// Runs the filtered conjugate gradient.
///
/// `dv` receives the (possibly partial) solution even when the
/// iteration does not converge or breaks down.
pub fn solve_filtered(
    a: &crate::BlockMatrix,
    b: &[Vec3],
    s: &[Mat3],
    z: &[Vec3],
    dv: &mut [Vec3],
    settings: &CgSettings,
) -> CgOutcome {
    let n = a.vertex_count();
    debug_assert!(b.len() == n && s.len() == n && z.len() == n && dv.len() == n);

    dv.copy_from_slice(z);

    let mut fb = b.to_vec();
    filter(&mut fb, s);
    let bnorm2 = dot(&fb, &fb);

    // r = filter(b - A dv)
    let mut r = vec![Vec3::ZERO; n];
    a.mul_vec(dv, &mut r);
    for (ri, bi) in r.iter_mut().zip(b) {
        *ri = *bi - *ri;
    }
    filter(&mut r, s);

    let mut c = r.clone();
    let mut q = vec![Vec3::ZERO; n];

    let mut delta_new = dot(&r, &c);
    // With no external load the initial residual comes from the
    // constraint targets alone; measure convergence against it instead.
    let reference = if bnorm2 > 0.0 { bnorm2 } else { delta_new };
    let tol = settings.tolerance as f64;
    let delta_target = tol * tol * reference;

    let mut iterations = 0;
    let mut breakdown = !delta_new.is_finite();

    while !breakdown && delta_new > delta_target && iterations < settings.max_iterations {
        a.mul_vec(&c, &mut q);
        filter(&mut q, s);

        let cq = dot(&c, &q);
        if !cq.is_finite() || cq.abs() < f64::from(f32::MIN_POSITIVE) {
            breakdown = true;
            break;
        }

        let alpha = (delta_new / cq) as f32;
        for ((dvi, ci), (ri, qi)) in dv.iter_mut().zip(&c).zip(r.iter_mut().zip(&q)) {
            *dvi += *ci * alpha;
            *ri -= *qi * alpha;
        }

        let delta_old = delta_new;
        delta_new = dot(&r, &r);
        iterations += 1;
        if !delta_new.is_finite() {
            breakdown = true;
            break;
        }

        let beta = (delta_new / delta_old) as f32;
        for (ci, ri) in c.iter_mut().zip(&r) {
            *ci = *ri + *ci * beta;
        }
        filter(&mut c, s);
    }

    let error = if reference > 0.0 && delta_new.is_finite() {
        (delta_new / reference).sqrt() as f32
    } else if delta_new.is_finite() {
        0.0
    } else {
        f32::INFINITY
    };

    CgOutcome {
        iterations,
        error,
        converged: !breakdown && delta_new <= delta_target,
        breakdown,
    }
}
