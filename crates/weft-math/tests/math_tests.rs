//! Integration tests for weft-math.

use weft_math::cg::{solve_filtered, CgSettings};
use weft_math::faer_solver::FaerSolver;
use weft_math::mat3::{interp, outer};
use weft_math::sparse::{CsrMatrix, SparseSolver};
use weft_math::{BlockMatrix, Mat3, Vec3};

fn settings() -> CgSettings {
    CgSettings {
        max_iterations: 100,
        tolerance: 1e-4,
    }
}

/// Two vertices coupled by a symmetric block, diagonally dominant.
fn coupled_pair() -> BlockMatrix {
    let mut a = BlockMatrix::new(2, 1);
    a.set_diagonal(0, Mat3::from_diagonal(Vec3::splat(4.0)));
    a.set_diagonal(1, Mat3::from_diagonal(Vec3::splat(3.0)));
    let h = a.add_block(0, 1);
    a.add_to_block(h, Mat3::from_diagonal(Vec3::splat(-1.0)));
    a
}

// ─── Helper Tests ─────────────────────────────────────────────

#[test]
fn outer_product() {
    let m = outer(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 1.0, 0.0));
    assert_eq!(m * Vec3::Y, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(m * Vec3::X, Vec3::ZERO);
}

#[test]
fn interp_endpoints_are_exact() {
    let a = Vec3::new(0.3, -1.7, 2.9);
    let b = Vec3::new(1.1, 0.2, -0.4);
    assert_eq!(interp(a, b, 0.0), a);
    assert_eq!(interp(a, b, 1.0), b);
}

// ─── Block Matrix Tests ───────────────────────────────────────

#[test]
fn block_matrix_mirrors_off_diagonal() {
    let mut a = BlockMatrix::new(2, 1);
    let h = a.add_block(0, 1);
    a.add_to_block(h, Mat3::from_cols(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO));

    let x = [Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0)];
    let mut out = [Vec3::ZERO; 2];
    a.mul_vec(&x, &mut out);
    assert_eq!(out[0], Vec3::new(2.0, 0.0, 0.0));

    let x = [Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO];
    a.mul_vec(&x, &mut out);
    // Transposed block acts on row 1
    assert_eq!(out[1], Vec3::new(0.0, 2.0, 0.0));
}

#[test]
fn block_matrix_clear_keeps_capacity() {
    let mut a = BlockMatrix::new(3, 4);
    for _ in 0..4 {
        a.add_block(0, 2);
    }
    a.add_diagonal(1, Mat3::IDENTITY);
    let cap = a.off_diagonal_capacity();
    a.clear();
    assert_eq!(a.off_diagonal_count(), 0);
    assert_eq!(a.off_diagonal_capacity(), cap);
    assert_eq!(a.diagonal(1), Mat3::ZERO);
}

#[test]
fn linear_combination_matches_structure() {
    let a = coupled_pair();
    let mut b = BlockMatrix::new(2, 1);
    b.set_diagonal(0, Mat3::IDENTITY);
    let h = b.add_block(0, 1);
    b.add_to_block(h, Mat3::IDENTITY);

    let mut c = BlockMatrix::new(2, 1);
    c.set_linear_combination(&a, 1.0, &b, -2.0);
    assert_eq!(c.diagonal(0), Mat3::from_diagonal(Vec3::splat(2.0)));
    assert_eq!(c.block(0).block, Mat3::from_diagonal(Vec3::splat(-3.0)));
}

#[test]
fn block_to_csr_is_symmetric() {
    let csr = coupled_pair().to_csr();
    assert_eq!(csr.rows, 6);
    // 6 diagonal entries + 3 + 3 mirrored couplings
    assert_eq!(csr.nnz(), 12);
    let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let mut y = [0.0; 6];
    csr.mul_vec(&x, &mut y);
    assert!((y[0] - (4.0 - 4.0)).abs() < 1e-6);
    assert!((y[3] - (12.0 - 1.0)).abs() < 1e-6);
}

// ─── CSR Tests ───────────────────────────────────────────────

#[test]
fn empty_csr() {
    let m = CsrMatrix::new(3, 3);
    assert_eq!(m.nnz(), 0);
    assert_eq!(m.row_ptr.len(), 4);
}

#[test]
fn csr_from_triplets_unordered() {
    let triplets = vec![(0, 2, 3.0), (0, 0, 1.0), (0, 1, 2.0)];
    let m = CsrMatrix::from_triplets(1, 3, &triplets);
    assert_eq!(m.col_idx, vec![0, 1, 2]);
    assert_eq!(m.values, vec![1.0, 2.0, 3.0]);
}

#[test]
fn csr_from_triplets_sums_duplicates() {
    let triplets = vec![(1, 1, 1.5), (0, 0, 1.0), (1, 1, 2.5)];
    let m = CsrMatrix::from_triplets(2, 2, &triplets);
    assert_eq!(m.nnz(), 2);
    assert_eq!(m.row_ptr, vec![0, 1, 2]);
    assert_eq!(m.values, vec![1.0, 4.0]);
}

// ─── Filtered CG Tests ───────────────────────────────────────

#[test]
fn cg_solves_unconstrained_system() {
    let a = coupled_pair();
    let b = [Vec3::new(3.0, 1.0, 0.0), Vec3::new(2.0, -1.0, 5.0)];
    let s = [Mat3::IDENTITY; 2];
    let z = [Vec3::ZERO; 2];
    let mut dv = [Vec3::ZERO; 2];

    let out = solve_filtered(&a, &b, &s, &z, &mut dv, &settings());
    assert!(out.converged);
    assert!(!out.breakdown);

    let mut check = [Vec3::ZERO; 2];
    a.mul_vec(&dv, &mut check);
    for i in 0..2 {
        assert!((check[i] - b[i]).length() < 1e-3, "row {i}: {:?} vs {:?}", check[i], b[i]);
    }
}

#[test]
fn cg_respects_fixed_vertex() {
    let a = coupled_pair();
    let b = [Vec3::new(3.0, 1.0, 0.0), Vec3::new(2.0, -1.0, 5.0)];
    let s = [Mat3::ZERO, Mat3::IDENTITY];
    let z = [Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO];
    let mut dv = [Vec3::ZERO; 2];

    let out = solve_filtered(&a, &b, &s, &z, &mut dv, &settings());
    assert!(out.converged);
    assert_eq!(dv[0], z[0]);
    // Row 1 satisfied with vertex 0 held at z: 3 dv1 - dv0 = b1
    let expected = (b[1] + z[0]) / 3.0;
    assert!((dv[1] - expected).length() < 1e-3);
}

#[test]
fn cg_directional_filter_keeps_normal_component() {
    let mut a = BlockMatrix::new(1, 0);
    a.set_diagonal(0, Mat3::IDENTITY);
    let n = Vec3::Z;
    let s = [Mat3::IDENTITY - outer(n, n)];
    let z = [Vec3::new(0.0, 0.0, 0.25)];
    let b = [Vec3::new(1.0, 2.0, -7.0)];
    let mut dv = [Vec3::ZERO];

    let out = solve_filtered(&a, &b, &s, &z, &mut dv, &settings());
    assert!(out.converged);
    assert!((dv[0].z - 0.25).abs() < 1e-6);
    assert!((dv[0].x - 1.0).abs() < 1e-4);
    assert!((dv[0].y - 2.0).abs() < 1e-4);
}

#[test]
fn cg_zero_rhs_needs_no_iterations() {
    let a = coupled_pair();
    let mut dv = [Vec3::ONE; 2];
    let out = solve_filtered(&a, &[Vec3::ZERO; 2], &[Mat3::IDENTITY; 2], &[Vec3::ZERO; 2], &mut dv, &settings());
    assert_eq!(out.iterations, 0);
    assert!(out.converged);
    assert_eq!(out.error, 0.0);
    assert_eq!(dv, [Vec3::ZERO; 2]);
}

#[test]
fn cg_reports_breakdown_on_singular_system() {
    let a = BlockMatrix::new(1, 0);
    let mut dv = [Vec3::ZERO];
    let out = solve_filtered(&a, &[Vec3::X], &[Mat3::IDENTITY], &[Vec3::ZERO], &mut dv, &settings());
    assert!(out.breakdown);
    assert!(!out.converged);
}

#[test]
fn cg_iteration_cap() {
    let a = coupled_pair();
    let b = [Vec3::new(3.0, 1.0, 0.0), Vec3::new(2.0, -1.0, 5.0)];
    let mut dv = [Vec3::ZERO; 2];
    let capped = CgSettings {
        max_iterations: 1,
        tolerance: 1e-6,
    };
    let out = solve_filtered(&a, &b, &[Mat3::IDENTITY; 2], &[Vec3::ZERO; 2], &mut dv, &capped);
    assert_eq!(out.iterations, 1);
    assert!(!out.converged);
    assert!(out.error > 1e-6);
}

// ─── FaerSolver Tests ────────────────────────────────────────

#[test]
fn faer_identity_solve() {
    let triplets = vec![(0, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0)];
    let matrix = CsrMatrix::from_triplets(3, 3, &triplets);

    let mut solver = FaerSolver::new();
    assert!(!solver.is_factorized());

    solver.factorize(&matrix).unwrap();
    assert!(solver.is_factorized());

    let rhs = [3.0_f32, 7.0, -2.0];
    let mut sol = [0.0_f32; 3];
    solver.solve(&rhs, &mut sol).unwrap();

    for i in 0..3 {
        assert!((sol[i] - rhs[i]).abs() < 1e-5, "sol[{i}] = {}, expected {}", sol[i], rhs[i]);
    }
}

#[test]
fn faer_matches_cg_on_projected_system() {
    let a = coupled_pair();
    let b = [Vec3::new(3.0, 1.0, 0.0), Vec3::new(2.0, -1.0, 5.0)];
    let s = [Mat3::IDENTITY; 2];
    let mut dv = [Vec3::ZERO; 2];
    solve_filtered(&a, &b, &s, &[Vec3::ZERO; 2], &mut dv, &settings());

    let csr = a.projected(&s).to_csr();
    let mut solver = FaerSolver::new();
    solver.factorize(&csr).unwrap();
    let rhs: Vec<f32> = b.iter().flat_map(|v| v.to_array()).collect();
    let mut sol = vec![0.0_f32; 6];
    solver.solve(&rhs, &mut sol).unwrap();

    for i in 0..2 {
        let direct = Vec3::new(sol[i * 3], sol[i * 3 + 1], sol[i * 3 + 2]);
        assert!((direct - dv[i]).length() < 1e-3);
    }
}

#[test]
fn faer_rejects_empty_matrix() {
    let mut solver = FaerSolver::new();
    assert!(solver.factorize(&CsrMatrix::new(0, 0)).is_err());
    assert!(!solver.is_factorized());
}
