//! Per-frame time-stepping driver.
//!
//! [`ClothSolver`] owns the authoring vertices, springs and faces of one
//! simulated object together with its [`ImplicitSolver`]. Each call to
//! [`ClothSolver::solve_frame`] runs `settings.substeps` implicit substeps:
//! constraints from pins and contacts, force assembly, solve, commit.

use std::time::Instant;

use weft_contact::{collision_response, ContactProvider};
use weft_debug::{debug_hash, DebugCollector, InspectionHook, StateSnapshot};
use weft_math::mat3::interp;
use weft_math::{Mat3, Vec3};
use weft_mesh::{average_rest_length, ClothMesh, Face, Spring, SpringKind};
use weft_types::constants::{
    ALMOST_ZERO, BENDING_STIFFNESS_DIVISOR, DRAG_PERCENT_SCALE, GOAL_FRICTION_PERCENT_SCALE,
    GRAVITY_UNIT_SCALE,
};
use weft_types::{SolverIndex, VertexId, WeftError, WeftResult};

use crate::config::SimSettings;
use crate::external::{ForceField, VolumeField};
use crate::implicit::ImplicitSolver;
use crate::result::{FrameDiagnostics, SolverResult, SolverStatus};
use crate::state::{ClothVertex, SolverIndexMap, VertexFlags};
use crate::strategy;

const DEBUG_COLLISION: &str = "collision";
const DEBUG_HAIR_BENDING: &str = "hair_bending";
const CONTACT_COLOR: [f32; 3] = [1.0, 0.2, 0.2];
const IMPULSE_COLOR: [f32; 3] = [1.0, 0.8, 0.0];
const BENDING_TARGET_COLOR: [f32; 3] = [0.2, 0.6, 1.0];

/// Collaborators injected into one frame.
#[derive(Default)]
pub struct SolveContext<'a> {
    pub contacts: Option<&'a dyn ContactProvider>,
    pub force_field: Option<&'a dyn ForceField>,
    pub volume: Option<&'a mut dyn VolumeField>,
    pub debug: Option<&'a mut dyn DebugCollector>,
}

impl<'a> SolveContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contacts(mut self, provider: &'a dyn ContactProvider) -> Self {
        self.contacts = Some(provider);
        self
    }

    pub fn with_force_field(mut self, field: &'a dyn ForceField) -> Self {
        self.force_field = Some(field);
        self
    }

    pub fn with_volume(mut self, volume: &'a mut dyn VolumeField) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_debug(mut self, debug: &'a mut dyn DebugCollector) -> Self {
        self.debug = Some(debug);
        self
    }
}

/// Simulation driver for one cloth or hair object.
pub struct ClothSolver {
    vertices: Vec<ClothVertex>,
    springs: Vec<Spring>,
    faces: Vec<Face>,
    settings: SimSettings,
    average_length: f32,

    index_map: SolverIndexMap,
    solver: Option<ImplicitSolver>,
    needs_rebuild: bool,

    diagnostics: FrameDiagnostics,
    hooks: Vec<Box<dyn InspectionHook>>,
    frame: u32,
}

impl ClothSolver {
    /// Creates a driver. The solver itself is allocated lazily by the
    /// first frame or by [`init_solver`](Self::init_solver).
    pub fn new(mesh: &ClothMesh, springs: Vec<Spring>, settings: SimSettings) -> WeftResult<Self> {
        settings.validate()?;
        mesh.validate()?;

        let vertex_count = mesh.vertex_count();
        if let Some(spring) = springs
            .iter()
            .find(|s| s.any_vertex(|v| v as usize >= vertex_count))
        {
            return Err(WeftError::InvalidTopology(format!(
                "spring {:?} references a vertex outside 0..{vertex_count}",
                spring.kind
            )));
        }

        let vertices = mesh
            .positions
            .iter()
            .map(|&p| ClothVertex::new(p, settings.mass))
            .collect();

        Ok(Self {
            vertices,
            average_length: average_rest_length(&springs),
            springs,
            faces: mesh.faces.clone(),
            settings,
            index_map: SolverIndexMap::default(),
            solver: None,
            needs_rebuild: true,
            diagnostics: FrameDiagnostics::default(),
            hooks: Vec::new(),
            frame: 0,
        })
    }

    // ─── Authoring state ──────────────────────────────────────

    fn vertex_mut(&mut self, vertex: VertexId) -> WeftResult<&mut ClothVertex> {
        let count = self.vertices.len();
        self.vertices.get_mut(vertex.index()).ok_or_else(|| {
            WeftError::InvalidInput(format!("vertex {} out of range 0..{count}", vertex.0))
        })
    }

    pub fn set_pinned(&mut self, vertex: VertexId, pinned: bool) -> WeftResult<()> {
        let v = self.vertex_mut(vertex)?;
        v.flags.set(VertexFlags::PINNED, pinned);
        Ok(())
    }

    /// Excludes a vertex from the solve. Takes effect at the next rebuild.
    pub fn set_excluded(&mut self, vertex: VertexId, excluded: bool) -> WeftResult<()> {
        let v = self.vertex_mut(vertex)?;
        if v.is_excluded() != excluded {
            v.flags.set(VertexFlags::EXCLUDED, excluded);
            self.needs_rebuild = true;
        }
        Ok(())
    }

    pub fn set_mass(&mut self, vertex: VertexId, mass: f32) -> WeftResult<()> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(WeftError::InvalidInput(format!("vertex mass must be positive, got {mass}")));
        }
        self.vertex_mut(vertex)?.mass = mass;
        if let (Some(solver), Some(si)) = (self.solver.as_mut(), self.index_map.solver_index(vertex)) {
            solver.set_vertex_mass(si, mass);
        }
        Ok(())
    }

    /// Goal spring weight in `[0, 1]`.
    pub fn set_goal_weight(&mut self, vertex: VertexId, weight: f32) -> WeftResult<()> {
        self.vertex_mut(vertex)?.goal = weight.clamp(0.0, 1.0);
        Ok(())
    }

    /// Rest frame used by angular bending springs rooted at `vertex`.
    pub fn set_rest_orientation(&mut self, vertex: VertexId, orientation: Mat3) -> WeftResult<()> {
        self.vertex_mut(vertex)?.rest_orientation = orientation;
        if let (Some(solver), Some(si)) = (self.solver.as_mut(), self.index_map.solver_index(vertex)) {
            solver.set_rest_orientation(si, orientation);
        }
        Ok(())
    }

    /// Moves every vertex; velocities are kept.
    pub fn set_positions(&mut self, positions: &[Vec3]) -> WeftResult<()> {
        self.check_len(positions.len())?;
        for (v, &p) in self.vertices.iter_mut().zip(positions) {
            v.position = p;
        }
        if let Some(solver) = self.solver.as_mut() {
            for (vid, si) in self.index_map.iter() {
                solver.set_position(si, positions[vid.index()]);
            }
        }
        Ok(())
    }

    pub fn set_velocities(&mut self, velocities: &[Vec3]) -> WeftResult<()> {
        self.check_len(velocities.len())?;
        for (v, &vel) in self.vertices.iter_mut().zip(velocities) {
            v.velocity = vel;
        }
        if let Some(solver) = self.solver.as_mut() {
            for (vid, si) in self.index_map.iter() {
                solver.set_velocity(si, velocities[vid.index()]);
            }
        }
        Ok(())
    }

    /// Advances the animated goal: the previous target becomes the rest
    /// position of the coming frame.
    pub fn set_goal_targets(&mut self, targets: &[Vec3]) -> WeftResult<()> {
        self.check_len(targets.len())?;
        for (v, &t) in self.vertices.iter_mut().zip(targets) {
            v.rest_position = v.target_position;
            v.target_position = t;
        }
        Ok(())
    }

    fn check_len(&self, len: usize) -> WeftResult<()> {
        if len != self.vertices.len() {
            return Err(WeftError::InvalidInput(format!(
                "expected {} values, got {len}",
                self.vertices.len()
            )));
        }
        Ok(())
    }

    // ─── Solver lifecycle ─────────────────────────────────────

    /// Assigns solver indices and (re)allocates the implicit solver.
    ///
    /// The solver is reallocated when the active count changes; otherwise
    /// it is reused and only its vertex state is reloaded.
    pub fn init_solver(&mut self) {
        self.index_map = SolverIndexMap::assign(&mut self.vertices);
        let active_count = self.index_map.active_count();

        let map = &self.index_map;
        let block_count: usize = self
            .springs
            .iter()
            .filter(|s| !s.deactivated && !s.any_vertex(|v| map.solver_index(VertexId(v)).is_none()))
            .map(Spring::off_diagonal_blocks)
            .sum();

        let reuse = self
            .solver
            .as_ref()
            .is_some_and(|s| s.active_count() == active_count && s.off_diagonal_capacity() >= block_count);
        if !reuse {
            self.solver = Some(ImplicitSolver::new(active_count, block_count));
        }

        if let Some(solver) = self.solver.as_mut() {
            solver.set_linear_solver(strategy::from_settings(&self.settings.linear_solver));
            for (vid, si) in self.index_map.iter() {
                let v = &self.vertices[vid.index()];
                solver.set_vertex_mass(si, v.mass);
                solver.set_motion_state(si, v.position, v.velocity);
                solver.set_rest_orientation(si, v.rest_orientation);
            }
        }
        self.needs_rebuild = false;

        tracing::debug!(
            active = self.index_map.assigned_count(),
            vertices = self.vertices.len(),
            blocks = block_count,
            reused = reuse,
            "solver initialized"
        );
    }

    /// Drops the implicit solver; the next frame rebuilds it.
    pub fn free_solver(&mut self) {
        self.solver = None;
        self.needs_rebuild = true;
        for hook in &mut self.hooks {
            hook.on_simulation_end();
        }
    }

    pub fn add_hook(&mut self, hook: Box<dyn InspectionHook>) {
        self.hooks.push(hook);
    }

    // ─── Accessors ────────────────────────────────────────────

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    /// Replaces the settings; a changed linear solver applies at the next rebuild.
    pub fn set_settings(&mut self, settings: SimSettings) -> WeftResult<()> {
        settings.validate()?;
        if settings.linear_solver != self.settings.linear_solver {
            self.needs_rebuild = true;
        }
        self.settings = settings;
        Ok(())
    }

    pub fn diagnostics(&self) -> &FrameDiagnostics {
        &self.diagnostics
    }

    pub fn vertices(&self) -> &[ClothVertex] {
        &self.vertices
    }

    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    pub fn springs_mut(&mut self) -> &mut [Spring] {
        &mut self.springs
    }

    pub fn solver(&self) -> Option<&ImplicitSolver> {
        self.solver.as_ref()
    }

    pub fn index_map(&self) -> &SolverIndexMap {
        &self.index_map
    }

    pub fn positions(&self) -> Vec<Vec3> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    pub fn velocities(&self) -> Vec<Vec3> {
        self.vertices.iter().map(|v| v.velocity).collect()
    }

    /// Number of frames solved so far.
    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let time = f64::from(self.frame) * f64::from(self.settings.timescale);
        StateSnapshot::from_motion(self.frame, time, &self.positions(), &self.velocities())
    }

    // ─── Frame ────────────────────────────────────────────────

    /// Advances the object by one frame and returns the OR of all
    /// substep statuses.
    pub fn solve_frame(&mut self, ctx: &mut SolveContext<'_>) -> SolverStatus {
        if self.needs_rebuild || self.solver.is_none() {
            self.init_solver();
        }

        let start = Instant::now();
        let substeps = self.settings.substeps;
        let timescale = self.settings.timescale;
        let dt = self.settings.dt();

        for hook in &mut self.hooks {
            hook.on_frame_begin(self.frame, timescale, substeps);
        }
        self.diagnostics.begin();

        let Some(mut solver) = self.solver.take() else {
            return self.finish_frame(start);
        };

        if self.index_map.is_placeholder() {
            for s in 0..substeps {
                tracing::warn!(frame = self.frame, substep = s, "no active vertices, nothing to solve");
                self.record_substep(s, &SolverResult::invalid_input());
            }
            self.solver = Some(solver);
            return self.finish_frame(start);
        }

        if self.settings.goal_enabled {
            for (vid, si) in self.index_map.iter() {
                let v = &self.vertices[vid.index()];
                if v.is_pinned() {
                    solver.set_velocity(si, v.target_position - v.rest_position);
                }
            }
        }

        for s in 0..substeps {
            solver.clear_forces();
            solver.clear_constraints();

            let (positions, velocities) = self.gather_motion(&solver);

            self.apply_constraints(&mut solver, ctx, &positions, &velocities, s, dt);

            if self.settings.velocity_damping != 1.0 {
                for (_, si) in self.index_map.iter() {
                    let (_, v) = solver.motion_state(si);
                    solver.set_velocity(si, v * self.settings.velocity_damping);
                }
            }

            self.compute_forces(&mut solver, ctx, &positions, &velocities, s);

            let result = solver.solve(dt);
            self.record_substep(s, &result);
            if result.status.is_degraded() {
                tracing::warn!(
                    frame = self.frame,
                    substep = s,
                    status = ?result.status,
                    iterations = result.iterations,
                    error = result.error,
                    "substep solve degraded"
                );
            }
            if result.status.is_recoverable() {
                solver.apply_result();
            }

            let t = (s + 1) as f32 / substeps as f32;
            for (vid, si) in self.index_map.iter() {
                let v = &self.vertices[vid.index()];
                if v.is_pinned() {
                    solver.set_position(si, interp(v.rest_position, v.target_position, t));
                }
            }
        }

        for (vid, si) in self.index_map.iter() {
            let (x, v) = solver.motion_state(si);
            let vertex = &mut self.vertices[vid.index()];
            vertex.position = x;
            vertex.velocity = v;
        }
        self.solver = Some(solver);
        self.finish_frame(start)
    }

    fn record_substep(&mut self, substep: u32, result: &SolverResult) {
        self.diagnostics.record(result);
        for hook in &mut self.hooks {
            hook.on_substep(
                self.frame,
                substep,
                result.status.bits(),
                result.iterations,
                result.error,
            );
        }
    }

    fn finish_frame(&mut self, start: Instant) -> SolverStatus {
        self.diagnostics.finish();
        let wall_time = start.elapsed().as_secs_f64();
        let d = self.diagnostics;
        for hook in &mut self.hooks {
            hook.on_frame_end(self.frame, d.status.bits(), d.avg_iterations, wall_time);
        }
        tracing::debug!(
            frame = self.frame,
            status = ?d.status,
            substeps = d.substeps,
            avg_iterations = d.avg_iterations,
            max_error = d.max_error,
            wall_time,
            "frame solved"
        );
        self.frame += 1;
        d.status
    }

    /// Positions and velocities per authoring vertex: solver state for
    /// active vertices, the vertex's own state otherwise.
    fn gather_motion(&self, solver: &ImplicitSolver) -> (Vec<Vec3>, Vec<Vec3>) {
        self.vertices
            .iter()
            .map(|v| match v.solver_index {
                Some(si) => solver.motion_state(si),
                None => (v.position, v.velocity),
            })
            .unzip()
    }

    #[inline]
    fn index(&self, vertex: u32) -> Option<SolverIndex> {
        self.index_map.solver_index(VertexId(vertex))
    }

    fn apply_constraints(
        &mut self,
        solver: &mut ImplicitSolver,
        ctx: &mut SolveContext<'_>,
        positions: &[Vec3],
        velocities: &[Vec3],
        substep: u32,
        dt: f32,
    ) {
        for v in &mut self.vertices {
            v.impulse_count = 0;
            if let Some(si) = v.solver_index.filter(|_| v.is_pinned()) {
                solver.add_constraint_fixed(si, Vec3::ZERO);
            }
        }

        let collision = self.settings.collision;
        let Some(provider) = ctx.contacts.filter(|_| collision.enabled) else {
            return;
        };
        let contacts = provider.find_contacts(positions, velocities, dt);

        if let Some(debug) = ctx.debug.as_deref_mut() {
            debug.clear_category(DEBUG_COLLISION);
        }

        let mut constraint_count = 0u32;
        if collision.point_contacts {
            for contact in &contacts {
                let vid = contact.vertex.index();
                let Some(vertex) = self.vertices.get_mut(vid) else {
                    continue;
                };
                let Some(si) = vertex.solver_index else {
                    continue;
                };
                if vertex.is_pinned() || vertex.impulse_count > 0 {
                    continue;
                }
                let Some(impulse) = collision_response(contact, velocities[vid], dt, collision.restitution) else {
                    continue;
                };

                solver.add_constraint_directional(si, contact.normal, impulse);
                vertex.impulse_count += 1;
                tracing::trace!(
                    vertex = contact.vertex.0,
                    distance = contact.distance,
                    impulse = ?impulse,
                    "collision constraint"
                );
                constraint_count += 1;

                if let Some(debug) = ctx.debug.as_deref_mut() {
                    let hash = debug_hash(&[contact.vertex.0, substep]);
                    debug.add_dot(DEBUG_COLLISION, hash, positions[vid], CONTACT_COLOR);
                    debug.add_vector(DEBUG_COLLISION, hash ^ 1, positions[vid], impulse, IMPULSE_COLOR);
                }
            }
        }

        for hook in &mut self.hooks {
            hook.on_contacts(self.frame, contacts.len() as u32, constraint_count);
        }
    }

    fn compute_forces(
        &self,
        solver: &mut ImplicitSolver,
        ctx: &mut SolveContext<'_>,
        positions: &[Vec3],
        velocities: &[Vec3],
        substep: u32,
    ) {
        let settings = &self.settings;

        if settings.gravity_enabled {
            let g = Vec3::from(settings.gravity) * (GRAVITY_UNIT_SCALE * settings.effector_weight);
            for (vid, si) in self.index_map.iter() {
                solver.add_force_gravity(si, self.vertices[vid.index()].mass, g);
            }
        }

        solver.add_force_drag(settings.air_drag * DRAG_PERCENT_SCALE);

        if let Some(volume) = ctx.volume.as_deref_mut() {
            if settings.volume.is_active() {
                self.add_volume_forces(solver, volume, positions, velocities);
            }
        }

        if let Some(field) = ctx.force_field {
            self.add_wind_forces(solver, field);
        }

        self.add_spring_forces(solver, ctx, substep);
    }

    fn add_volume_forces(
        &self,
        solver: &mut ImplicitSolver,
        volume: &mut dyn VolumeField,
        positions: &[Vec3],
        velocities: &[Vec3],
    ) {
        let params = &self.settings.volume;
        let (min, max) = positions.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(lo, hi), &p| (lo.min(p), hi.max(p)),
        );
        let points: Vec<(Vec3, Vec3)> = positions.iter().copied().zip(velocities.iter().copied()).collect();
        volume.build(params.voxel_resolution, min, max, &points);

        let smoothing = 2.0 * params.velocity_smoothing;
        for (_, si) in self.index_map.iter() {
            let (x, v) = solver.motion_state(si);
            let sample = volume.forces(x, v, smoothing, params.pressure, params.pressure_threshold);
            solver.add_force_external(si, sample.force, sample.dfdx, sample.dfdv);
        }
    }

    fn add_wind_forces(&self, solver: &mut ImplicitSolver, field: &dyn ForceField) {
        let mut winds = vec![Vec3::ZERO; solver.active_count()];
        for (vid, si) in self.index_map.iter() {
            let (x, v) = solver.motion_state(si);
            winds[si.index()] = field.sample(vid, x, v);
        }

        if !self.faces.is_empty() {
            for face in &self.faces {
                let Some(corners) = face
                    .vertices()
                    .iter()
                    .map(|&v| self.index(v))
                    .collect::<Option<Vec<_>>>()
                else {
                    continue;
                };
                let face_winds: Vec<Vec3> = corners.iter().map(|si| winds[si.index()]).collect();
                solver.add_force_face_wind(&corners, &face_winds);
            }
        } else {
            for spring in &self.springs {
                if let SpringKind::Structural { ij, kl } = spring.kind {
                    if let (Some(i), Some(j)) = (self.index(ij), self.index(kl)) {
                        solver.add_force_edge_wind(i, j, winds[i.index()], winds[j.index()]);
                    }
                }
            }
        }
    }

    fn add_spring_forces(&self, solver: &mut ImplicitSolver, ctx: &mut SolveContext<'_>, substep: u32) {
        let s = &self.settings;
        let avg = self.average_length + ALMOST_ZERO;
        let bending_scale = BENDING_STIFFNESS_DIVISOR * avg;
        let cb = s.bending_damping / bending_scale;

        for spring in &self.springs {
            if spring.deactivated {
                continue;
            }
            let stiffness = spring.stiffness;

            match spring.kind {
                SpringKind::Structural { ij, kl } | SpringKind::Shear { ij, kl } | SpringKind::Sewing { ij, kl } => {
                    let (Some(i), Some(j)) = (self.index(ij), self.index(kl)) else {
                        continue;
                    };
                    let k = (s.structural + stiffness * (s.max_structural - s.structural).abs()) / avg;
                    let max_force = match spring.kind {
                        SpringKind::Sewing { .. } => s.max_sewing_force,
                        _ => 0.0,
                    };
                    solver.add_force_spring_linear(
                        i,
                        j,
                        spring.rest_length,
                        k,
                        s.spring_damping,
                        s.no_compression,
                        max_force,
                    );
                }
                SpringKind::Goal { vertex } => {
                    if !s.goal_enabled {
                        continue;
                    }
                    let Some(i) = self.index(vertex) else {
                        continue;
                    };
                    let v = &self.vertices[vertex as usize];
                    let goal_x = interp(v.rest_position, v.target_position, substep as f32 / s.substeps as f32);
                    let goal_v = v.target_position - v.rest_position;
                    let k = v.goal * (s.goal_spring + stiffness * (s.max_structural - s.goal_spring).abs()) / avg;
                    solver.add_force_spring_goal(i, goal_x, goal_v, k, s.goal_friction * GOAL_FRICTION_PERCENT_SCALE);
                }
                SpringKind::Bending { ij, kl } => {
                    let (Some(i), Some(j)) = (self.index(ij), self.index(kl)) else {
                        continue;
                    };
                    let kb = (s.bending + stiffness * (s.max_bending - s.bending).abs()) / bending_scale;
                    solver.add_force_spring_bending(i, j, spring.rest_length, kb, cb);
                }
                SpringKind::BendingAngular { ij, kl, mn, target } => {
                    let (Some(i), Some(j), Some(k)) = (self.index(ij), self.index(kl), self.index(mn)) else {
                        continue;
                    };
                    let kb = (s.bending + stiffness * (s.max_bending - s.bending).abs()) / bending_scale;
                    let goal_dir = solver.add_force_spring_bending_angular(i, j, k, target, kb, cb);

                    if let Some(debug) = ctx.debug.as_deref_mut() {
                        let (xj, _) = solver.motion_state(j);
                        let (xk, _) = solver.motion_state(k);
                        let length = (xk - xj).length();
                        debug.add_line(
                            DEBUG_HAIR_BENDING,
                            debug_hash(&[ij, kl, mn]),
                            xj,
                            xj + goal_dir * length,
                            BENDING_TARGET_COLOR,
                        );
                    }
                }
            }
        }
    }
}
