//! Integration tests for weft-solver.

use weft_contact::GroundPlane;
use weft_debug::DebugRecorder;
use weft_math::{Mat3, Vec3};
use weft_mesh::generators::{hair_strand, quad_grid};
use weft_mesh::{ClothMesh, Spring, SpringKind, SpringOptions, SpringTopology};
use weft_solver::external::{ForceField, VolumeField};
use weft_solver::forces::{
    bending_fb, bending_fb_derivative, spring_bending, spring_bending_angular, spring_linear,
};
use weft_solver::{
    ClothSolver, FrameDiagnostics, ImplicitSolver, LinearSolverKind, SimSettings, SolveContext, SolverPhase,
    SolverResult, SolverStatus, UniformWind, VelocityConstraint, VelocityGrid,
};
use weft_types::{SolverIndex, VertexId};

fn quiet_settings() -> SimSettings {
    SimSettings {
        air_drag: 0.0,
        gravity_enabled: false,
        ..Default::default()
    }
}

fn cloth_springs(mesh: &ClothMesh) -> Vec<Spring> {
    SpringTopology::build(mesh).springs(mesh, SpringOptions::default())
}

fn single_vertex(position: Vec3) -> ClothMesh {
    ClothMesh::new(vec![position], Vec::new()).unwrap()
}

// ─── ImplicitSolver Tests ─────────────────────────────────────

#[test]
fn handle_free_fall_single_step() {
    let mut solver = ImplicitSolver::new(1, 0);
    let i = SolverIndex(0);
    solver.set_vertex_mass(i, 0.3);
    solver.set_motion_state(i, Vec3::ZERO, Vec3::ZERO);

    solver.clear_forces();
    solver.clear_constraints();
    solver.add_force_gravity(i, 0.3, Vec3::new(0.0, 0.0, -1.0));
    let result = solver.solve(0.1);

    assert_eq!(result.status, SolverStatus::SUCCESS);
    assert_eq!(solver.phase(), SolverPhase::Solved);
    assert!(solver.apply_result());

    let (x, v) = solver.motion_state(i);
    assert!((v.z + 0.1).abs() < 1e-6, "v.z = {}", v.z);
    assert!((x.z + 0.01).abs() < 1e-6, "x.z = {}", x.z);
}

#[test]
fn handle_gravity_substep_matches_euler() {
    let mut solver = ImplicitSolver::new(1, 0);
    let i = SolverIndex(0);
    solver.set_vertex_mass(i, 1.0);
    solver.clear_forces();
    solver.clear_constraints();
    solver.add_force_gravity(i, 1.0, Vec3::new(0.0, 0.0, -9.8));
    assert!(solver.solve(0.01).is_success());
    solver.apply_result();

    let (_, v) = solver.motion_state(i);
    assert!((v.z + 0.098).abs() < 1e-6, "v.z = {}", v.z);
}

#[test]
fn handle_pinned_spring_relaxes_toward_rest_length() {
    let mut solver = ImplicitSolver::new(2, 1);
    let (a, b) = (SolverIndex(0), SolverIndex(1));
    solver.set_vertex_mass(b, 1.0);
    solver.set_motion_state(a, Vec3::ZERO, Vec3::ZERO);
    solver.set_motion_state(b, Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO);

    for _ in 0..100 {
        solver.clear_forces();
        solver.clear_constraints();
        solver.add_constraint_fixed(a, Vec3::ZERO);
        // Roughly critical damping for k = 10, m = 1.
        solver.add_force_spring_linear(a, b, 1.0, 10.0, 6.3, false, 0.0);
        let result = solver.solve(0.01);
        assert!(!result.status.contains(SolverStatus::INVALID_INPUT));
        assert!(solver.apply_result());
    }

    let (xa, _) = solver.motion_state(a);
    let (xb, _) = solver.motion_state(b);
    assert_eq!(xa, Vec3::ZERO);
    assert!((xb.x - 1.0).abs() < 0.3, "x = {}", xb.x);
    assert!(xb.y.abs() < 1e-6 && xb.z.abs() < 1e-6);
}

#[test]
fn handle_idle_solve_is_exact() {
    let mut solver = ImplicitSolver::new(4, 0);
    solver.clear_forces();
    solver.clear_constraints();
    let result = solver.solve(0.2);

    assert_eq!(result.status, SolverStatus::SUCCESS);
    assert_eq!(result.iterations, 0);
    for i in 0..4 {
        assert_eq!(solver.velocity_change(SolverIndex(i)), Vec3::ZERO);
    }
}

#[test]
fn handle_empty_system_is_invalid() {
    let mut solver = ImplicitSolver::new(0, 0);
    solver.clear_forces();
    let result = solver.solve(0.2);
    assert_eq!(result.status, SolverStatus::INVALID_INPUT);
    assert!(!solver.apply_result());
}

#[test]
fn handle_rejects_non_finite_state() {
    let mut solver = ImplicitSolver::new(2, 0);
    solver.set_motion_state(SolverIndex(1), Vec3::new(f32::NAN, 0.0, 0.0), Vec3::ZERO);
    solver.clear_forces();
    let result = solver.solve(0.2);
    assert_eq!(result.status, SolverStatus::INVALID_INPUT);
    assert_eq!(solver.phase(), SolverPhase::Rejected);
    assert!(!solver.apply_result());
}

#[test]
fn handle_fixed_constraint_prescribes_velocity_change() {
    let mut solver = ImplicitSolver::new(2, 1);
    let (a, b) = (SolverIndex(0), SolverIndex(1));
    solver.set_motion_state(a, Vec3::ZERO, Vec3::ZERO);
    solver.set_motion_state(b, Vec3::new(1.5, 0.0, 0.0), Vec3::ZERO);

    solver.clear_forces();
    solver.clear_constraints();
    solver.add_constraint_fixed(a, Vec3::new(0.0, 0.5, 0.0));
    assert!(solver.add_force_spring_linear(a, b, 1.0, 10.0, 0.0, false, 0.0));
    let result = solver.solve(0.1);
    assert!(result.status.is_recoverable());

    assert!((solver.velocity_change(a) - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-6);
    // The stretched spring pulls b back toward a.
    assert!(solver.velocity_change(b).x < 0.0);
}

#[test]
fn handle_spring_forces_are_opposite() {
    let mut solver = ImplicitSolver::new(2, 1);
    solver.set_motion_state(SolverIndex(0), Vec3::ZERO, Vec3::ZERO);
    solver.set_motion_state(SolverIndex(1), Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO);
    solver.clear_forces();
    solver.add_force_spring_linear(SolverIndex(0), SolverIndex(1), 1.0, 3.0, 0.0, false, 0.0);

    let f0 = solver.force(SolverIndex(0));
    let f1 = solver.force(SolverIndex(1));
    assert!((f0 + f1).length() < 1e-6);
    assert!((f0.x - 3.0).abs() < 1e-5);
    assert_eq!(solver.off_diagonal_count(), 1);
}

#[test]
fn handle_angular_straight_strand_has_no_force() {
    let mut solver = ImplicitSolver::new(3, 3);
    for (i, z) in [0.0, -1.0, -2.0].into_iter().enumerate() {
        solver.set_motion_state(SolverIndex(i as u32), Vec3::new(0.0, 0.0, z), Vec3::ZERO);
    }
    solver.clear_forces();
    let goal = solver.add_force_spring_bending_angular(
        SolverIndex(0),
        SolverIndex(1),
        SolverIndex(2),
        Vec3::NEG_Z,
        1.0,
        0.1,
    );

    assert!((goal - Vec3::NEG_Z).length() < 1e-6);
    assert!(solver.force(SolverIndex(1)).length() < 1e-6);
    assert!(solver.force(SolverIndex(2)).length() < 1e-6);
    assert_eq!(solver.off_diagonal_count(), 3);
}

#[test]
fn handle_angular_uses_rest_orientation() {
    let mut solver = ImplicitSolver::new(3, 3);
    for (i, z) in [0.0, -1.0, -2.0].into_iter().enumerate() {
        solver.set_motion_state(SolverIndex(i as u32), Vec3::new(0.0, 0.0, z), Vec3::ZERO);
    }
    // Rotates the local target 90° about Y: -Z maps to -X.
    solver.set_rest_orientation(SolverIndex(1), Mat3::from_rotation_y(std::f32::consts::FRAC_PI_2));
    solver.clear_forces();
    let goal = solver.add_force_spring_bending_angular(
        SolverIndex(0),
        SolverIndex(1),
        SolverIndex(2),
        Vec3::NEG_Z,
        1.0,
        0.0,
    );

    assert!((goal - Vec3::NEG_X).length() < 1e-5, "goal = {goal:?}");
    let fk = solver.force(SolverIndex(2));
    assert!(fk.x < 0.0 && fk.z > 0.0, "fk = {fk:?}");
    assert!((fk + solver.force(SolverIndex(1))).length() < 1e-6);
}

#[test]
fn handle_angular_target_length_is_ignored() {
    let mut solver = ImplicitSolver::new(3, 3);
    for (i, z) in [0.0, -1.0, -2.0].into_iter().enumerate() {
        solver.set_motion_state(SolverIndex(i as u32), Vec3::new(0.0, 0.0, z), Vec3::ZERO);
    }
    solver.clear_forces();
    let goal = solver.add_force_spring_bending_angular(
        SolverIndex(0),
        SolverIndex(1),
        SolverIndex(2),
        Vec3::new(0.0, 0.0, -3.0),
        1.0,
        0.0,
    );

    assert!((goal - Vec3::NEG_Z).length() < 1e-6);
    assert!(solver.force(SolverIndex(2)).length() < 1e-6);
}

#[test]
fn handle_goal_spring_pulls_toward_target() {
    let pull = |k: f32| {
        let mut solver = ImplicitSolver::new(1, 0);
        let i = SolverIndex(0);
        solver.set_motion_state(i, Vec3::ZERO, Vec3::ZERO);
        solver.clear_forces();
        assert!(solver.add_force_spring_goal(i, Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO, k, 0.0));
        solver.force(i)
    };

    let f = pull(3.0);
    assert!((f - Vec3::new(6.0, 0.0, 0.0)).length() < 1e-5, "f = {f:?}");
    assert!((pull(6.0) - f * 2.0).length() < 1e-5);
}

#[test]
fn handle_goal_spring_at_target_is_inactive() {
    let mut solver = ImplicitSolver::new(1, 0);
    let i = SolverIndex(0);
    solver.set_motion_state(i, Vec3::ONE, Vec3::ZERO);
    solver.clear_forces();
    assert!(!solver.add_force_spring_goal(i, Vec3::ONE, Vec3::X, 5.0, 0.0));
    assert_eq!(solver.force(i), Vec3::ZERO);
}

#[test]
fn handle_compressed_bending_pair_is_pushed_apart() {
    let mut solver = ImplicitSolver::new(2, 1);
    let (a, b) = (SolverIndex(0), SolverIndex(1));
    solver.set_motion_state(a, Vec3::ZERO, Vec3::ZERO);
    solver.set_motion_state(b, Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO);
    solver.clear_forces();

    assert!(solver.add_force_spring_bending(a, b, 1.0, 1.0, 0.5));
    let (fa, fb) = (solver.force(a), solver.force(b));
    assert!(fa.x < 0.0 && fb.x > 0.0, "fa = {fa:?}, fb = {fb:?}");
    assert!((fa + fb).length() < 1e-6);
    assert_eq!(solver.off_diagonal_count(), 1);
}

#[test]
fn handle_stretched_bending_pair_has_no_force() {
    let mut solver = ImplicitSolver::new(2, 1);
    let (a, b) = (SolverIndex(0), SolverIndex(1));
    solver.set_motion_state(a, Vec3::ZERO, Vec3::ZERO);
    solver.set_motion_state(b, Vec3::new(1.5, 0.0, 0.0), Vec3::ZERO);
    solver.clear_forces();

    assert!(!solver.add_force_spring_bending(a, b, 1.0, 1.0, 0.5));
    assert_eq!(solver.force(a), Vec3::ZERO);
    assert_eq!(solver.force(b), Vec3::ZERO);
}

// ─── Force Model Tests ────────────────────────────────────────

#[test]
fn linear_spring_respects_no_compression() {
    let compressed = spring_linear(
        Vec3::ZERO,
        Vec3::new(0.5, 0.0, 0.0),
        Vec3::ZERO,
        Vec3::ZERO,
        1.0,
        10.0,
        0.0,
        true,
        0.0,
    );
    assert!(compressed.is_none());

    let stretched = spring_linear(
        Vec3::ZERO,
        Vec3::new(1.5, 0.0, 0.0),
        Vec3::ZERO,
        Vec3::ZERO,
        1.0,
        10.0,
        0.0,
        true,
        2.0,
    )
    .unwrap();
    // 10 * 0.5 = 5 clamps to the max force.
    assert!((stretched.f.x - 2.0).abs() < 1e-6);
}

#[test]
fn bending_force_follows_buckling_curve() {
    let x = Vec3::new(0.5, 0.0, 0.0);
    // At half the rest length the curve is far below the linear term,
    // so the linear term cb * (length - rest) wins.
    let s = spring_bending(Vec3::ZERO, x, 1.0, 1.0, 0.5).unwrap();
    assert!((s.f.x + 0.25).abs() < 1e-5, "f = {:?}", s.f);
    assert!((s.dfdx.x_axis.x + 0.5).abs() < 1e-5);
    assert_eq!(s.dfdv, Mat3::ZERO);

    // With strong damping the curve term is the larger one.
    let s = spring_bending(Vec3::ZERO, x, 1.0, 1.0, 10.0).unwrap();
    assert!((s.f.x - bending_fb(0.5)).abs() < 1e-5, "f = {:?}", s.f);
    assert!((s.dfdx.x_axis.x + bending_fb_derivative(0.5)).abs() < 1e-4);
    assert!(spring_bending(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 1.0, 1.0, 0.5).is_none());
}

#[test]
fn angular_jacobian_matches_stiffness() {
    let x = [Vec3::ZERO, Vec3::NEG_Z, Vec3::new(0.0, 0.0, -2.0)];
    let a = spring_bending_angular(x, [Vec3::ZERO; 3], Vec3::NEG_Z, 2.0, 0.0);
    // Lateral motion of k is resisted with the full stiffness.
    assert!((a.dfk_dxk.x_axis.x + 2.0).abs() < 1e-2);
    assert!((a.dfj_dxj - (-a.dfk_dxj)).abs_diff_eq(Mat3::ZERO, 1e-6));
}

// ─── Constraint Tests ─────────────────────────────────────────

#[test]
fn constraint_filters() {
    let dir = VelocityConstraint::Directional {
        normal: Vec3::Z,
        impulse: Vec3::new(0.0, 0.0, 0.3),
    };
    assert!((dir.filter() * Vec3::Z).length() < 1e-6);
    assert!((dir.filter() * Vec3::X - Vec3::X).length() < 1e-6);
    assert_eq!(dir.removed_dofs(), 1);

    let planar = VelocityConstraint::Planar {
        n1: Vec3::X,
        n2: Vec3::Y,
        dv: Vec3::ZERO,
    };
    assert!((planar.filter() * Vec3::new(1.0, 1.0, 1.0) - Vec3::Z).length() < 1e-6);
    assert_eq!(planar.removed_dofs(), 2);

    let fixed = VelocityConstraint::Fixed { dv: Vec3::X };
    assert_eq!(fixed.filter(), Mat3::ZERO);
    assert_eq!(fixed.target(), Vec3::X);
    assert!(VelocityConstraint::default().is_free());
}

#[test]
fn planar_constraint_leaves_one_free_direction() {
    let mut solver = ImplicitSolver::new(1, 0);
    let i = SolverIndex(0);
    solver.clear_forces();
    solver.clear_constraints();
    solver.add_constraint_planar(i, Vec3::Z, Vec3::X, Vec3::ZERO);
    solver.add_force_external(i, Vec3::new(1.0, 2.0, -3.0), Mat3::ZERO, Mat3::ZERO);
    assert_eq!(solver.constraint(i).removed_dofs(), 2);

    assert!(solver.solve(0.1).status.is_recoverable());
    let dv = solver.velocity_change(i);
    assert!(dv.x.abs() < 1e-6 && dv.z.abs() < 1e-6);
    assert!((dv.y - 0.2).abs() < 1e-6);
}

// ─── Diagnostics Tests ────────────────────────────────────────

#[test]
fn diagnostics_aggregate_substeps() {
    let mut d = FrameDiagnostics::default();
    d.begin();
    d.record(&SolverResult::new(SolverStatus::SUCCESS, 3, 0.01));
    d.record(&SolverResult::new(SolverStatus::NO_CONVERGENCE, 100, 0.5));
    d.record(&SolverResult::new(SolverStatus::SUCCESS, 5, 0.03));
    d.finish();

    assert_eq!(d.status, SolverStatus::SUCCESS | SolverStatus::NO_CONVERGENCE);
    assert_eq!(d.substeps, 3);
    assert_eq!(d.min_iterations, 3);
    assert_eq!(d.max_iterations, 100);
    assert!((d.avg_iterations - 36.0).abs() < 1e-5);
    assert!((d.min_error - 0.01).abs() < 1e-7);
    assert!((d.max_error - 0.03).abs() < 1e-7);
    // Only successful errors are summed, divided by every substep.
    assert!((d.avg_error - 0.04 / 3.0).abs() < 1e-6);
    assert_eq!(d.success_count(), 2);
    assert!(d.status.is_degraded());
    assert!(d.status.is_recoverable());
}

// ─── Settings Tests ───────────────────────────────────────────

#[test]
fn settings_toml_round_trip() {
    let settings = SimSettings::hair();
    let text = toml::to_string(&settings).unwrap();
    let parsed: SimSettings = toml::from_str(&text).unwrap();
    assert_eq!(parsed, settings);
}

#[test]
fn settings_partial_toml_uses_defaults() {
    let parsed: SimSettings = toml::from_str("substeps = 10\n[linear_solver]\nkind = \"Cholesky\"\nmax_iterations = 1\ntolerance = 0.001\n").unwrap();
    assert_eq!(parsed.substeps, 10);
    assert_eq!(parsed.linear_solver.kind, LinearSolverKind::Cholesky);
    assert_eq!(parsed.mass, SimSettings::default().mass);
    assert!(parsed.validate().is_ok());
}

#[test]
fn settings_validation() {
    let bad = SimSettings {
        substeps: 0,
        ..Default::default()
    };
    assert!(bad.validate().is_err());

    let bad = SimSettings {
        mass: -1.0,
        ..Default::default()
    };
    assert!(ClothSolver::new(&single_vertex(Vec3::ZERO), Vec::new(), bad).is_err());
}

// ─── Driver Tests ─────────────────────────────────────────────

#[test]
fn driver_gravity_one_frame() {
    let settings = SimSettings {
        substeps: 1,
        air_drag: 0.0,
        ..Default::default()
    };
    let mut cloth = ClothSolver::new(&single_vertex(Vec3::ZERO), Vec::new(), settings).unwrap();
    let status = cloth.solve_frame(&mut SolveContext::new());

    assert_eq!(status, SolverStatus::SUCCESS);
    let v = cloth.velocities()[0];
    let x = cloth.positions()[0];
    // Gravity is scaled to frame units: 9.81 * 0.001.
    assert!((v.z + 0.00981).abs() < 1e-6, "v.z = {}", v.z);
    assert!((x.z + 0.00981).abs() < 1e-6, "x.z = {}", x.z);
    assert_eq!(cloth.frame(), 1);
}

#[test]
fn driver_spring_settles_at_rest_length() {
    let mesh = ClothMesh::new(vec![Vec3::ZERO, Vec3::new(0.0, 0.0, -1.5)], Vec::new()).unwrap();
    let springs = vec![Spring::new(SpringKind::Structural { ij: 0, kl: 1 }, 1.0)];
    let mut cloth = ClothSolver::new(&mesh, springs, quiet_settings()).unwrap();
    cloth.set_pinned(VertexId(0), true).unwrap();

    for _ in 0..200 {
        cloth.solve_frame(&mut SolveContext::new());
    }
    let p = cloth.positions();
    let length = (p[1] - p[0]).length();
    assert!((length - 1.0).abs() < 1e-2, "length = {length}");
    assert!(cloth.velocities()[1].length() < 1e-2);
}

#[test]
fn driver_all_excluded_is_invalid_input() {
    let mesh = quad_grid(1, 1, 1.0, 1.0);
    let springs = cloth_springs(&mesh);
    let mut cloth = ClothSolver::new(&mesh, springs, SimSettings::default()).unwrap();
    for v in 0..mesh.vertex_count() {
        cloth.set_excluded(VertexId(v as u32), true).unwrap();
    }

    let before = cloth.positions();
    let status = cloth.solve_frame(&mut SolveContext::new());

    assert_eq!(status, SolverStatus::INVALID_INPUT);
    assert_eq!(cloth.diagnostics().substeps, SimSettings::default().substeps);
    assert!(cloth.index_map().is_placeholder());
    assert_eq!(cloth.positions(), before);
}

#[test]
fn driver_idle_cloth_stays_put() {
    let mesh = quad_grid(2, 2, 1.0, 1.0);
    let springs = cloth_springs(&mesh);
    let mut cloth = ClothSolver::new(&mesh, springs, quiet_settings()).unwrap();

    let status = cloth.solve_frame(&mut SolveContext::new());
    assert_eq!(status, SolverStatus::SUCCESS);
    assert!(cloth.velocities().iter().all(|v| v.length() < 1e-6));
    assert_eq!(cloth.diagnostics().max_iterations, 0);
}

#[test]
fn driver_pinned_vertices_do_not_move() {
    let mesh = quad_grid(3, 3, 1.0, 1.0);
    let springs = cloth_springs(&mesh);
    let mut cloth = ClothSolver::new(&mesh, springs, SimSettings::default()).unwrap();
    cloth.set_pinned(VertexId(0), true).unwrap();
    cloth.set_pinned(VertexId(3), true).unwrap();

    for _ in 0..10 {
        cloth.solve_frame(&mut SolveContext::new());
    }
    let p = cloth.positions();
    assert_eq!(p[0], mesh.positions[0]);
    assert_eq!(p[3], mesh.positions[3]);
    // The free bottom row sags.
    assert!(p[14].z < -1e-3);
}

#[test]
fn driver_pinned_vertices_follow_goal_targets() {
    let mesh = quad_grid(1, 1, 1.0, 1.0);
    let springs = cloth_springs(&mesh);
    let settings = SimSettings {
        goal_enabled: true,
        ..quiet_settings()
    };
    let mut cloth = ClothSolver::new(&mesh, springs, settings).unwrap();
    cloth.set_pinned(VertexId(0), true).unwrap();

    let shift = Vec3::new(0.1, 0.0, 0.0);
    let targets: Vec<Vec3> = mesh.positions.iter().map(|p| *p + shift).collect();
    cloth.set_goal_targets(&targets).unwrap();
    cloth.solve_frame(&mut SolveContext::new());

    assert!((cloth.positions()[0] - targets[0]).length() < 1e-6);
    assert!((cloth.velocities()[0] - shift).length() < 1e-5);
    // Neighbours are dragged along by the structural springs.
    assert!(cloth.positions()[1].x > mesh.positions[1].x);
}

#[test]
fn driver_pinned_velocity_is_per_frame_displacement() {
    let mesh = quad_grid(1, 1, 1.0, 1.0);
    let springs = cloth_springs(&mesh);
    let settings = SimSettings {
        goal_enabled: true,
        timescale: 2.0,
        ..quiet_settings()
    };
    let mut cloth = ClothSolver::new(&mesh, springs, settings).unwrap();
    cloth.set_pinned(VertexId(0), true).unwrap();

    let shift = Vec3::new(0.0, 0.2, 0.0);
    let targets: Vec<Vec3> = mesh.positions.iter().map(|p| *p + shift).collect();
    cloth.set_goal_targets(&targets).unwrap();
    cloth.solve_frame(&mut SolveContext::new());

    assert!((cloth.velocities()[0] - shift).length() < 1e-5);
}

fn goal_pull(weight: f32) -> Vec3 {
    let mesh = single_vertex(Vec3::ZERO);
    let springs = vec![Spring::new(SpringKind::Goal { vertex: 0 }, 0.0)];
    let settings = SimSettings {
        goal_enabled: true,
        ..quiet_settings()
    };
    let mut cloth = ClothSolver::new(&mesh, springs, settings).unwrap();
    cloth.set_goal_weight(VertexId(0), weight).unwrap();
    cloth.set_goal_targets(&[Vec3::new(0.5, 0.0, 0.0)]).unwrap();
    cloth.solve_frame(&mut SolveContext::new());
    cloth.positions()[0]
}

#[test]
fn driver_goal_spring_pulls_free_vertex_toward_target() {
    let full = goal_pull(1.0);
    let weak = goal_pull(0.1);

    assert!(full.x > 0.3 && full.x < 0.5, "full = {full:?}");
    assert!(weak.x > 0.0 && weak.x < full.x, "weak = {weak:?}, full = {full:?}");
    assert!(full.y.abs() < 1e-6 && full.z.abs() < 1e-6);
    assert_eq!(goal_pull(0.0), Vec3::ZERO);
}

#[test]
fn driver_goal_spring_needs_goal_enabled() {
    let mesh = single_vertex(Vec3::ZERO);
    let springs = vec![Spring::new(SpringKind::Goal { vertex: 0 }, 0.0)];
    let mut cloth = ClothSolver::new(&mesh, springs, quiet_settings()).unwrap();
    cloth.set_goal_weight(VertexId(0), 1.0).unwrap();
    cloth.set_goal_targets(&[Vec3::new(0.5, 0.0, 0.0)]).unwrap();
    cloth.solve_frame(&mut SolveContext::new());
    assert_eq!(cloth.positions()[0], Vec3::ZERO);
}

/// Velocity of a bent hair tip after one substep, root segment pinned.
fn bent_tip_velocity(stiffness: f32, bending: f32, max_bending: f32) -> Vec3 {
    let (mesh, springs) = hair_strand(Vec3::ZERO, Vec3::NEG_Z, 2, 1.0);
    let springs = springs
        .into_iter()
        .map(|s| match s.kind {
            SpringKind::BendingAngular { .. } => s.with_stiffness(stiffness),
            _ => s,
        })
        .collect();
    let settings = SimSettings {
        substeps: 1,
        bending,
        max_bending,
        bending_damping: 0.0,
        spring_damping: 0.0,
        ..quiet_settings()
    };
    let mut cloth = ClothSolver::new(&mesh, springs, settings).unwrap();
    cloth.set_pinned(VertexId(0), true).unwrap();
    cloth.set_pinned(VertexId(1), true).unwrap();
    // Tip bent 90° off the strand axis.
    cloth
        .set_positions(&[mesh.positions[0], mesh.positions[1], Vec3::new(1.0, 0.0, -1.0)])
        .unwrap();
    cloth.solve_frame(&mut SolveContext::new());
    cloth.velocities()[2]
}

#[test]
fn driver_angular_bending_blends_stiffness_range() {
    // A zero blend factor still resists with the base bending stiffness.
    let base = bent_tip_velocity(0.0, 5.0, 5.0);
    assert!(base.x < 0.0, "base = {base:?}");

    // bending + s * |max - bending| gives 5 in both cases.
    let blended = bent_tip_velocity(1.0, 1.0, 5.0);
    let flat = bent_tip_velocity(1.0, 5.0, 5.0);
    assert!((blended - flat).length() < 1e-6, "blended = {blended:?}, flat = {flat:?}");

    let soft = bent_tip_velocity(0.5, 1.0, 5.0);
    assert!(soft.x < 0.0 && soft.x > flat.x, "soft = {soft:?}, flat = {flat:?}");
}

#[test]
fn driver_excluded_vertex_keeps_its_state() {
    let mesh = quad_grid(2, 2, 1.0, 1.0);
    let springs = cloth_springs(&mesh);
    let mut cloth = ClothSolver::new(&mesh, springs, SimSettings::default()).unwrap();
    cloth.set_excluded(VertexId(4), true).unwrap();

    cloth.solve_frame(&mut SolveContext::new());
    assert_eq!(cloth.positions()[4], mesh.positions[4]);
    assert!(cloth.positions()[0].z < 0.0);
    assert_eq!(cloth.index_map().assigned_count(), 8);
}

#[test]
fn driver_is_deterministic() {
    let run = || {
        let mesh = quad_grid(4, 4, 1.0, 1.0);
        let springs = cloth_springs(&mesh);
        let mut cloth = ClothSolver::new(&mesh, springs, SimSettings::default()).unwrap();
        cloth.set_pinned(VertexId(0), true).unwrap();
        for _ in 0..10 {
            cloth.solve_frame(&mut SolveContext::new());
        }
        cloth.snapshot().to_bytes().unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn driver_reserves_blocks_for_hair() {
    let (mesh, springs) = hair_strand(Vec3::ZERO, Vec3::NEG_Z, 4, 0.25);
    let mut cloth = ClothSolver::new(&mesh, springs, quiet_settings()).unwrap();
    cloth.set_pinned(VertexId(0), true).unwrap();
    cloth.init_solver();

    let solver = cloth.solver().unwrap();
    assert!(solver.off_diagonal_capacity() >= 14);

    cloth.solve_frame(&mut SolveContext::new());
    // 4 structural + 3 angular * 3 blocks; the goal spring's block stays unused.
    assert_eq!(cloth.solver().unwrap().off_diagonal_count(), 13);
}

#[test]
fn driver_cholesky_matches_cg() {
    let run = |kind: LinearSolverKind| {
        let mut settings = SimSettings::default();
        settings.linear_solver.kind = kind;
        settings.linear_solver.max_iterations = 1000;
        settings.linear_solver.tolerance = 1e-6;

        let mesh = quad_grid(3, 3, 1.0, 1.0);
        let springs = cloth_springs(&mesh);
        let mut cloth = ClothSolver::new(&mesh, springs, settings).unwrap();
        cloth.set_pinned(VertexId(0), true).unwrap();
        cloth.set_pinned(VertexId(3), true).unwrap();
        for _ in 0..3 {
            cloth.solve_frame(&mut SolveContext::new());
        }
        (cloth.solver().unwrap().linear_solver_name().to_string(), cloth.positions())
    };

    let (cg_name, cg) = run(LinearSolverKind::ConjugateGradient);
    let (ch_name, ch) = run(LinearSolverKind::Cholesky);
    assert_eq!(cg_name, "conjugate_gradient");
    assert_eq!(ch_name, "cholesky");
    for (a, b) in cg.iter().zip(&ch) {
        assert!((*a - *b).length() < 1e-4, "cg {a:?} vs cholesky {b:?}");
    }
}

#[test]
fn driver_ground_contact_stops_approach() {
    let settings = SimSettings {
        substeps: 1,
        ..quiet_settings()
    };
    let mut cloth = ClothSolver::new(&single_vertex(Vec3::new(0.0, 0.0, 0.05)), Vec::new(), settings).unwrap();
    cloth.set_velocities(&[Vec3::new(0.2, 0.0, -1.0)]).unwrap();

    let ground = GroundPlane::new(0.0, 0.01);
    let mut debug = DebugRecorder::new();
    let mut ctx = SolveContext::new().with_contacts(&ground).with_debug(&mut debug);
    let status = cloth.solve_frame(&mut ctx);

    assert_eq!(status, SolverStatus::SUCCESS);
    let v = cloth.velocities()[0];
    assert!(v.z.abs() < 1e-5, "v = {v:?}");
    // Tangential motion is untouched.
    assert!((v.x - 0.2).abs() < 1e-5);
    assert!(debug.category("collision").count() >= 1);
}

#[test]
fn driver_detect_only_contacts_add_no_constraints() {
    let mut settings = SimSettings {
        substeps: 1,
        ..quiet_settings()
    };
    settings.collision.point_contacts = false;
    let mut cloth = ClothSolver::new(&single_vertex(Vec3::new(0.0, 0.0, 0.05)), Vec::new(), settings).unwrap();
    cloth.set_velocities(&[Vec3::new(0.0, 0.0, -1.0)]).unwrap();
    cloth.add_hook(Box::new(RecordingHook::default()));

    let ground = GroundPlane::new(0.0, 0.01);
    cloth.solve_frame(&mut SolveContext::new().with_contacts(&ground));
    assert!((cloth.velocities()[0].z + 1.0).abs() < 1e-5);
}

#[test]
fn driver_face_wind_pushes_along_normal() {
    let mesh = quad_grid(2, 2, 1.0, 1.0);
    let springs = cloth_springs(&mesh);
    let mut cloth = ClothSolver::new(&mesh, springs, quiet_settings()).unwrap();

    let wind = UniformWind::new(Vec3::new(0.0, 0.0, 5.0));
    cloth.solve_frame(&mut SolveContext::new().with_force_field(&wind));
    assert!(cloth.velocities().iter().all(|v| v.z > 0.0));
}

#[test]
fn driver_edge_wind_on_hair() {
    let (mesh, springs) = hair_strand(Vec3::ZERO, Vec3::NEG_Z, 3, 0.5);
    let mut cloth = ClothSolver::new(&mesh, springs, quiet_settings()).unwrap();
    cloth.set_pinned(VertexId(0), true).unwrap();

    // Wind along the strand has no effect; across it, it does.
    let along = UniformWind::new(Vec3::new(0.0, 0.0, 5.0));
    cloth.solve_frame(&mut SolveContext::new().with_force_field(&along));
    assert!(cloth.velocities().iter().all(|v| v.length() < 1e-6));

    let across = UniformWind::new(Vec3::new(5.0, 0.0, 0.0));
    cloth.solve_frame(&mut SolveContext::new().with_force_field(&across));
    assert!(cloth.velocities()[3].x > 0.0);
}

#[test]
fn driver_hooks_see_every_substep() {
    let mesh = quad_grid(1, 1, 1.0, 1.0);
    let springs = cloth_springs(&mesh);
    let mut cloth = ClothSolver::new(&mesh, springs, SimSettings::default()).unwrap();
    let hook = RecordingHook::default();
    let log = hook.log.clone();
    cloth.add_hook(Box::new(hook));

    cloth.solve_frame(&mut SolveContext::new());
    cloth.free_solver();

    let log = log.lock().unwrap();
    let substeps = log.iter().filter(|e| matches!(e, Recorded::Substep)).count();
    assert_eq!(substeps, 5);
    assert!(matches!(log.first(), Some(Recorded::FrameBegin)));
    assert!(matches!(log.last(), Some(Recorded::SimulationEnd)));
}

#[test]
fn driver_volume_smoothing_damps_relative_motion() {
    let mesh = ClothMesh::new(vec![Vec3::ZERO, Vec3::ONE, Vec3::splat(0.5)], Vec::new()).unwrap();
    let mut settings = quiet_settings();
    settings.volume.velocity_smoothing = 0.5;
    settings.volume.voxel_resolution = 2;
    let mut cloth = ClothSolver::new(&mesh, Vec::new(), settings).unwrap();
    cloth
        .set_velocities(&[Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO, Vec3::ZERO])
        .unwrap();

    let mut grid = VelocityGrid::new();
    cloth.solve_frame(&mut SolveContext::new().with_volume(&mut grid));
    let v = cloth.velocities();
    // The fast corner vertex is slowed, the centre vertex is dragged along.
    assert!(v[0].x < 1.0);
    assert!(v[2].x > 0.0);
    assert_eq!(grid.resolution(), 2);
}

// ─── External Field Tests ─────────────────────────────────────

#[test]
fn velocity_grid_samples_uniform_flow() {
    let mut grid = VelocityGrid::new();
    let flow = Vec3::new(1.0, 0.0, 0.0);
    let points: Vec<(Vec3, Vec3)> = (0..8)
        .map(|c| {
            let p = Vec3::new((c & 1) as f32, ((c >> 1) & 1) as f32, ((c >> 2) & 1) as f32);
            (p, flow)
        })
        .collect();
    grid.build(2, Vec3::ZERO, Vec3::ONE, &points);

    let center = Vec3::splat(0.5);
    assert!((grid.velocity_at(center) - flow).length() < 1e-6);
    assert!((grid.density_at(center) - 1.0).abs() < 1e-6);

    let sample = grid.forces(center, Vec3::ZERO, 2.0, 1.0, 0.5);
    assert!((sample.force - flow * 2.0).length() < 1e-5);
    assert_eq!(sample.dfdv, Mat3::IDENTITY * -2.0);

    let outside = grid.forces(Vec3::splat(5.0), Vec3::ZERO, 2.0, 1.0, 0.5);
    assert_eq!(outside.force, Vec3::ZERO);
}

#[test]
fn uniform_wind_ignores_position() {
    let wind = UniformWind::new(Vec3::X);
    assert_eq!(wind.sample(VertexId(3), Vec3::splat(9.0), Vec3::ZERO), Vec3::X);
    assert_eq!(wind.name(), "uniform_wind");
}

// ─── Helpers ──────────────────────────────────────────────────

#[derive(Debug)]
enum Recorded {
    FrameBegin,
    Substep,
    FrameEnd,
    SimulationEnd,
}

#[derive(Default)]
struct RecordingHook {
    log: std::sync::Arc<std::sync::Mutex<Vec<Recorded>>>,
}

impl weft_debug::InspectionHook for RecordingHook {
    fn on_frame_begin(&mut self, _frame: u32, _timescale: f32, _substeps: u32) {
        self.log.lock().unwrap().push(Recorded::FrameBegin);
    }

    fn on_substep(&mut self, _frame: u32, _substep: u32, _status: u32, _iterations: u32, _error: f32) {
        self.log.lock().unwrap().push(Recorded::Substep);
    }

    fn on_frame_end(&mut self, _frame: u32, _status: u32, _avg_iterations: f32, _wall_time: f64) {
        self.log.lock().unwrap().push(Recorded::FrameEnd);
    }

    fn on_simulation_end(&mut self) {
        self.log.lock().unwrap().push(Recorded::SimulationEnd);
    }

    fn name(&self) -> &str {
        "recording_hook"
    }
}
