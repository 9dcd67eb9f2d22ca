//! Implicit mass-spring integrator.
//!
//! [`ImplicitSolver`] owns the whole per-object system: masses, motion
//! state, force and Jacobian accumulators, constraints and the solved
//! state. One substep is:
//!
//! ```text
//! clear_forces / clear_constraints
//! add_constraint_*          (any order relative to forces)
//! add_force_*
//! solve(dt)                 A Δv = b under the constraint filter
//! apply_result()            x, v ← x', v'
//! ```
//!
//! with `A = M - dt ∂f/∂v - dt² ∂f/∂x` and `b = dt f + dt² (∂f/∂x) v`
//! (Baraff & Witkin 1998). The solved velocity is `v' = v + Δv`, the
//! position `x' = x + v' dt`.

use weft_math::mat3::is_finite_mat3;
use weft_math::{BlockMatrix, Mat3, Vec3};
use weft_types::SolverIndex;

use crate::constraint::VelocityConstraint;
use crate::forces::{self, SpringForce};
use crate::result::{SolverResult, SolverStatus};
use crate::strategy::{ConjugateGradientSolver, LinearSolver};

/// Position in the per-substep state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverPhase {
    Idle,
    ForcesCleared,
    ConstraintsApplied,
    ForcesAssembled,
    /// A solve produced a committable state.
    Solved,
    /// The last solve was rejected; `apply_result` is a no-op.
    Rejected,
}

/// Owned solver handle for one simulated object.
pub struct ImplicitSolver {
    active_count: usize,
    mass: Vec<f32>,
    x: Vec<Vec3>,
    v: Vec<Vec3>,
    rest_orientation: Vec<Mat3>,

    f: Vec<Vec3>,
    dfdx: BlockMatrix,
    dfdv: BlockMatrix,
    constraints: Vec<VelocityConstraint>,

    a: BlockMatrix,
    dv: Vec<Vec3>,
    x_new: Vec<Vec3>,
    v_new: Vec<Vec3>,

    linear: Box<dyn LinearSolver>,
    phase: SolverPhase,
}

impl ImplicitSolver {
    /// Creates a solver for `active_count` vertices with room for
    /// `off_diagonal_blocks` coupling blocks per substep.
    ///
    /// A zero `active_count` yields a handle whose `solve` always reports
    /// `INVALID_INPUT`.
    pub fn new(active_count: usize, off_diagonal_blocks: usize) -> Self {
        Self {
            active_count,
            mass: vec![1.0; active_count],
            x: vec![Vec3::ZERO; active_count],
            v: vec![Vec3::ZERO; active_count],
            rest_orientation: vec![Mat3::IDENTITY; active_count],
            f: vec![Vec3::ZERO; active_count],
            dfdx: BlockMatrix::new(active_count, off_diagonal_blocks),
            dfdv: BlockMatrix::new(active_count, off_diagonal_blocks),
            constraints: vec![VelocityConstraint::Free; active_count],
            a: BlockMatrix::new(active_count, off_diagonal_blocks),
            dv: vec![Vec3::ZERO; active_count],
            x_new: vec![Vec3::ZERO; active_count],
            v_new: vec![Vec3::ZERO; active_count],
            linear: Box::new(ConjugateGradientSolver::default()),
            phase: SolverPhase::Idle,
        }
    }

    /// Replaces the linear solve strategy.
    pub fn with_linear_solver(mut self, linear: Box<dyn LinearSolver>) -> Self {
        self.linear = linear;
        self
    }

    pub fn set_linear_solver(&mut self, linear: Box<dyn LinearSolver>) {
        self.linear = linear;
    }

    pub fn linear_solver_name(&self) -> &str {
        self.linear.name()
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Off-diagonal block capacity reserved at creation.
    pub fn off_diagonal_capacity(&self) -> usize {
        self.dfdx.off_diagonal_capacity()
    }

    /// Off-diagonal blocks used by the current substep.
    pub fn off_diagonal_count(&self) -> usize {
        self.dfdx.off_diagonal_count()
    }

    pub fn phase(&self) -> SolverPhase {
        self.phase
    }

    // ─── Vertex state ─────────────────────────────────────────

    fn slot(&self, index: SolverIndex) -> Option<usize> {
        let i = index.index();
        (i < self.active_count).then_some(i)
    }

    pub fn set_vertex_mass(&mut self, index: SolverIndex, mass: f32) {
        if let Some(i) = self.slot(index) {
            self.mass[i] = mass;
        }
    }

    pub fn vertex_mass(&self, index: SolverIndex) -> f32 {
        self.slot(index).map_or(0.0, |i| self.mass[i])
    }

    pub fn set_motion_state(&mut self, index: SolverIndex, position: Vec3, velocity: Vec3) {
        if let Some(i) = self.slot(index) {
            self.x[i] = position;
            self.v[i] = velocity;
        }
    }

    /// Committed `(position, velocity)`.
    pub fn motion_state(&self, index: SolverIndex) -> (Vec3, Vec3) {
        self.slot(index)
            .map_or((Vec3::ZERO, Vec3::ZERO), |i| (self.x[i], self.v[i]))
    }

    pub fn set_position(&mut self, index: SolverIndex, position: Vec3) {
        if let Some(i) = self.slot(index) {
            self.x[i] = position;
        }
    }

    pub fn set_velocity(&mut self, index: SolverIndex, velocity: Vec3) {
        if let Some(i) = self.slot(index) {
            self.v[i] = velocity;
        }
    }

    pub fn set_rest_orientation(&mut self, index: SolverIndex, orientation: Mat3) {
        if let Some(i) = self.slot(index) {
            self.rest_orientation[i] = orientation;
        }
    }

    pub fn rest_orientation(&self, index: SolverIndex) -> Mat3 {
        self.slot(index)
            .map_or(Mat3::IDENTITY, |i| self.rest_orientation[i])
    }

    /// Accumulated force on a vertex in the current substep.
    pub fn force(&self, index: SolverIndex) -> Vec3 {
        self.slot(index).map_or(Vec3::ZERO, |i| self.f[i])
    }

    /// Velocity change of the last solve.
    pub fn velocity_change(&self, index: SolverIndex) -> Vec3 {
        self.slot(index).map_or(Vec3::ZERO, |i| self.dv[i])
    }

    pub fn constraint(&self, index: SolverIndex) -> VelocityConstraint {
        self.slot(index)
            .map_or(VelocityConstraint::Free, |i| self.constraints[i])
    }

    // ─── Clearing ─────────────────────────────────────────────

    /// Zeroes forces and Jacobians; coupling blocks are released.
    pub fn clear_forces(&mut self) {
        self.f.fill(Vec3::ZERO);
        self.dfdx.clear();
        self.dfdv.clear();
        self.phase = SolverPhase::ForcesCleared;
    }

    pub fn clear_constraints(&mut self) {
        self.constraints.fill(VelocityConstraint::Free);
    }

    // ─── Constraints ──────────────────────────────────────────

    fn set_constraint(&mut self, index: SolverIndex, constraint: VelocityConstraint) {
        if let Some(i) = self.slot(index) {
            self.constraints[i] = constraint;
            if self.phase != SolverPhase::ForcesAssembled {
                self.phase = SolverPhase::ConstraintsApplied;
            }
        }
    }

    /// Fixes all three velocity directions; `dv` is the velocity change.
    pub fn add_constraint_fixed(&mut self, index: SolverIndex, dv: Vec3) {
        self.set_constraint(index, VelocityConstraint::Fixed { dv });
    }

    /// Fixes the directions `n1` and `n2` (orthonormal).
    pub fn add_constraint_planar(&mut self, index: SolverIndex, n1: Vec3, n2: Vec3, dv: Vec3) {
        self.set_constraint(index, VelocityConstraint::Planar { n1, n2, dv });
    }

    /// Prescribes the velocity change along `normal`.
    pub fn add_constraint_directional(&mut self, index: SolverIndex, normal: Vec3, impulse: Vec3) {
        self.set_constraint(index, VelocityConstraint::Directional { normal, impulse });
    }

    // ─── Forces ───────────────────────────────────────────────

    fn assembled(&mut self) {
        self.phase = SolverPhase::ForcesAssembled;
    }

    /// Constant force `mass · g`.
    pub fn add_force_gravity(&mut self, index: SolverIndex, mass: f32, g: Vec3) {
        if let Some(i) = self.slot(index) {
            self.f[i] += g * mass;
            self.assembled();
        }
    }

    /// Viscous drag `-drag · v` on every vertex.
    pub fn add_force_drag(&mut self, drag: f32) {
        let d = Mat3::IDENTITY * -drag;
        for i in 0..self.active_count {
            self.f[i] -= self.v[i] * drag;
            self.dfdv.add_diagonal(i, d);
        }
        self.assembled();
    }

    /// Arbitrary per-vertex force with its own Jacobians.
    pub fn add_force_external(&mut self, index: SolverIndex, force: Vec3, dfdx: Mat3, dfdv: Mat3) {
        if let Some(i) = self.slot(index) {
            self.f[i] += force;
            self.dfdx.add_diagonal(i, dfdx);
            self.dfdv.add_diagonal(i, dfdv);
            self.assembled();
        }
    }

    /// Wind over a triangle (3 indices) or quad (4 indices); `winds`
    /// holds one sample per corner.
    pub fn add_force_face_wind(&mut self, corners: &[SolverIndex], winds: &[Vec3]) {
        let Some(slots) = corners
            .iter()
            .map(|c| self.slot(*c))
            .collect::<Option<Vec<_>>>()
        else {
            return;
        };
        let positions: Vec<Vec3> = slots.iter().map(|&i| self.x[i]).collect();
        let forces = forces::face_wind(&positions, winds);
        for (&i, f) in slots.iter().zip(forces) {
            self.f[i] += f;
        }
        self.assembled();
    }

    /// Wind over a hair segment.
    pub fn add_force_edge_wind(&mut self, i: SolverIndex, j: SolverIndex, wind_i: Vec3, wind_j: Vec3) {
        let (Some(i), Some(j)) = (self.slot(i), self.slot(j)) else {
            return;
        };
        let (fi, fj) = forces::edge_wind(self.x[i], self.x[j], wind_i, wind_j);
        self.f[i] += fi;
        self.f[j] += fj;
        self.assembled();
    }

    /// Adds a two-vertex spring: `f` on `i`, `-f` on `j`, and the coupling block.
    fn apply_spring(&mut self, i: usize, j: usize, s: &SpringForce) {
        let block = self.add_block(i, j);
        self.f[i] += s.f;
        self.f[j] -= s.f;
        self.dfdx.add_diagonal(i, s.dfdx);
        self.dfdx.add_diagonal(j, s.dfdx);
        self.dfdx.add_to_block(block, -s.dfdx);
        self.dfdv.add_diagonal(i, s.dfdv);
        self.dfdv.add_diagonal(j, s.dfdv);
        self.dfdv.add_to_block(block, -s.dfdv);
    }

    /// Reserves the same coupling block in both Jacobians.
    fn add_block(&mut self, row: usize, col: usize) -> usize {
        let h = self.dfdx.add_block(row, col);
        let h2 = self.dfdv.add_block(row, col);
        debug_assert_eq!(h, h2);
        h
    }

    /// Linear distance spring. Returns true if it produced a force.
    #[allow(clippy::too_many_arguments)]
    pub fn add_force_spring_linear(
        &mut self,
        i: SolverIndex,
        j: SolverIndex,
        rest_length: f32,
        k: f32,
        damping: f32,
        no_compress: bool,
        max_force: f32,
    ) -> bool {
        let (Some(i), Some(j)) = (self.slot(i), self.slot(j)) else {
            return false;
        };
        let Some(s) = forces::spring_linear(
            self.x[i],
            self.x[j],
            self.v[i],
            self.v[j],
            rest_length,
            k,
            damping,
            no_compress,
            max_force,
        ) else {
            return false;
        };
        self.apply_spring(i, j, &s);
        self.assembled();
        true
    }

    /// Spring toward an animated goal position and velocity.
    pub fn add_force_spring_goal(
        &mut self,
        index: SolverIndex,
        goal_x: Vec3,
        goal_v: Vec3,
        k: f32,
        friction: f32,
    ) -> bool {
        let Some(i) = self.slot(index) else {
            return false;
        };
        let Some(s) = forces::spring_goal(self.x[i], self.v[i], goal_x, goal_v, k, friction) else {
            return false;
        };
        self.f[i] += s.f;
        self.dfdx.add_diagonal(i, s.dfdx);
        self.dfdv.add_diagonal(i, s.dfdv);
        self.assembled();
        true
    }

    /// Linear bending spring; acts only under compression.
    pub fn add_force_spring_bending(
        &mut self,
        i: SolverIndex,
        j: SolverIndex,
        rest_length: f32,
        kb: f32,
        cb: f32,
    ) -> bool {
        let (Some(i), Some(j)) = (self.slot(i), self.slot(j)) else {
            return false;
        };
        let Some(s) = forces::spring_bending(self.x[i], self.x[j], rest_length, kb, cb) else {
            return false;
        };
        self.apply_spring(i, j, &s);
        self.assembled();
        true
    }

    /// Angular bending over `i → j → k`.
    ///
    /// `target` is the rest direction of `j → k` in the rest frame of `j`.
    /// Only its direction matters; the length is discarded after rotation.
    /// Returns the world-space goal direction used.
    pub fn add_force_spring_bending_angular(
        &mut self,
        i: SolverIndex,
        j: SolverIndex,
        k: SolverIndex,
        target: Vec3,
        kb: f32,
        cb: f32,
    ) -> Vec3 {
        let (Some(i), Some(j), Some(k)) = (self.slot(i), self.slot(j), self.slot(k)) else {
            return Vec3::ZERO;
        };
        let goal_dir = (self.rest_orientation[j] * target).normalize_or_zero();

        let a = forces::spring_bending_angular(
            [self.x[i], self.x[j], self.x[k]],
            [self.v[i], self.v[j], self.v[k]],
            goal_dir,
            kb,
            cb,
        );

        let block_ji = self.add_block(j, i);
        let block_kj = self.add_block(k, j);
        let block_ki = self.add_block(k, i);

        self.f[j] += a.fj;
        self.f[k] += a.fk;

        self.dfdx.add_diagonal(j, a.dfj_dxj);
        self.dfdx.add_diagonal(k, a.dfk_dxk);
        self.dfdx.add_to_block(block_ji, a.dfj_dxi);
        self.dfdx.add_to_block(block_kj, a.dfk_dxj);
        self.dfdx.add_to_block(block_ki, a.dfk_dxi);

        self.dfdv.add_diagonal(j, a.dfj_dvj);
        self.dfdv.add_diagonal(k, a.dfk_dvk);
        self.dfdv.add_to_block(block_ji, a.dfj_dvi);
        self.dfdv.add_to_block(block_kj, a.dfk_dvj);
        self.dfdv.add_to_block(block_ki, a.dfk_dvi);

        self.assembled();
        goal_dir
    }

    // ─── Solve ────────────────────────────────────────────────

    fn has_invalid_input(&self) -> bool {
        self.active_count == 0
            || self.f.iter().any(|f| !f.is_finite())
            || self.x.iter().any(|x| !x.is_finite())
            || self.v.iter().any(|v| !v.is_finite())
            || self.mass.iter().any(|m| !m.is_finite())
            || !self.dfdx.diagonals().all(is_finite_mat3)
            || !self.dfdv.diagonals().all(is_finite_mat3)
    }

    /// Solves for the new velocities and positions of the substep.
    ///
    /// The solution is stored but not committed; see [`apply_result`](Self::apply_result).
    /// `NO_CONVERGENCE` and `NUMERICAL_ISSUE` still store the best solution
    /// found. `INVALID_INPUT` stores nothing.
    pub fn solve(&mut self, dt: f32) -> SolverResult {
        if dt.is_nan() || dt <= 0.0 || self.has_invalid_input() {
            self.phase = SolverPhase::Rejected;
            return SolverResult::invalid_input();
        }
        let n = self.active_count;

        // A = M - dt dF/dv - dt² dF/dx
        self.a.set_linear_combination(&self.dfdv, -dt, &self.dfdx, -dt * dt);
        for i in 0..n {
            self.a.add_diagonal(i, Mat3::IDENTITY * self.mass[i]);
        }

        // b = dt f + dt² (dF/dx) v
        let mut b = vec![Vec3::ZERO; n];
        self.dfdx.mul_vec(&self.v, &mut b);
        for (bi, fi) in b.iter_mut().zip(&self.f) {
            *bi = *fi * dt + *bi * (dt * dt);
        }

        let s: Vec<Mat3> = self.constraints.iter().map(VelocityConstraint::filter).collect();
        let z: Vec<Vec3> = self.constraints.iter().map(VelocityConstraint::target).collect();

        let mut result = self.linear.solve(&self.a, &b, &s, &z, &mut self.dv);

        if self.dv.iter().any(|d| !d.is_finite()) {
            // Keep the state usable: fall back to the constrained targets.
            self.dv.copy_from_slice(&z);
            result.status = (result.status - SolverStatus::SUCCESS) | SolverStatus::NUMERICAL_ISSUE;
        }

        for i in 0..n {
            self.v_new[i] = self.v[i] + self.dv[i];
            self.x_new[i] = self.x[i] + self.v_new[i] * dt;
        }
        self.phase = SolverPhase::Solved;
        result
    }

    /// Commits the last solved state. Returns false if there was nothing
    /// to commit.
    pub fn apply_result(&mut self) -> bool {
        if self.phase != SolverPhase::Solved {
            return false;
        }
        self.x.copy_from_slice(&self.x_new);
        self.v.copy_from_slice(&self.v_new);
        self.phase = SolverPhase::Idle;
        true
    }
}
