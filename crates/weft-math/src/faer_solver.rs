//! Sparse Cholesky solver backed by `faer`.
//!
//! Implements the [`SparseSolver`] trait using faer's supernodal LLᵀ
//! factorization. The solver operates in f64 internally for numerical
//! robustness but accepts and returns f32 at the interface boundary.
//!
//! The mass-spring system matrix changes every substep, so unlike a
//! prefactored projective-dynamics matrix the factorization is redone
//! for each solve.

use faer::linalg::solvers::Solve;
use faer::sparse::linalg::solvers::{Llt, SymbolicLlt};
use faer::sparse::SparseColMat;
use faer::sparse::Triplet;
use faer::Side;
use weft_types::{WeftError, WeftResult};

use crate::sparse::{CsrMatrix, SparseSolver};

/// Sparse Cholesky (LLᵀ) solver using `faer`.
pub struct FaerSolver {
    factorization: Option<Llt<usize, f64>>,
    dimension: usize,
}

impl FaerSolver {
    /// Creates a new solver (unfactorized).
    pub fn new() -> Self {
        Self {
            factorization: None,
            dimension: 0,
        }
    }

    /// Convert our CSR matrix (f32) to faer's CSC matrix (f64).
    fn csr_to_csc_f64(matrix: &CsrMatrix) -> WeftResult<SparseColMat<usize, f64>> {
        let mut triplets: Vec<Triplet<usize, usize, f64>> = Vec::with_capacity(matrix.values.len());
        for row in 0..matrix.rows {
            for idx in matrix.row_ptr[row]..matrix.row_ptr[row + 1] {
                let col = matrix.col_idx[idx];
                let val = matrix.values[idx] as f64;
                triplets.push(Triplet { row, col, val });
            }
        }

        SparseColMat::try_new_from_triplets(matrix.rows, matrix.cols, &triplets)
            .map_err(|e| WeftError::Factorization(format!("cannot build CSC matrix: {e:?}")))
    }
}

impl Default for FaerSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SparseSolver for FaerSolver {
    fn factorize(&mut self, matrix: &CsrMatrix) -> WeftResult<()> {
        self.factorization = None;

        if matrix.rows != matrix.cols {
            return Err(WeftError::Factorization(format!(
                "matrix must be square, got {}×{}",
                matrix.rows, matrix.cols
            )));
        }
        if matrix.rows == 0 {
            return Err(WeftError::Factorization("cannot factorize empty matrix".into()));
        }

        self.dimension = matrix.rows;

        let csc = Self::csr_to_csc_f64(matrix)?;

        let symbolic = SymbolicLlt::try_new(csc.symbolic().as_ref(), Side::Upper)
            .map_err(|e| WeftError::Factorization(format!("symbolic analysis: {e:?}")))?;

        let llt = Llt::try_new_with_symbolic(symbolic, csc.as_ref(), Side::Upper)
            .map_err(|e| WeftError::Factorization(format!("numeric LLᵀ: {e:?}")))?;

        self.factorization = Some(llt);
        Ok(())
    }

    fn solve(&self, rhs: &[f32], solution: &mut [f32]) -> WeftResult<()> {
        let llt = self
            .factorization
            .as_ref()
            .ok_or_else(|| WeftError::Factorization("solver not factorized".into()))?;

        if rhs.len() != self.dimension || solution.len() != self.dimension {
            return Err(WeftError::InvalidInput(format!(
                "rhs/solution length ({}/{}) != matrix dimension ({})",
                rhs.len(),
                solution.len(),
                self.dimension
            )));
        }

        let rhs_f64: faer::Mat<f64> = faer::Mat::from_fn(self.dimension, 1, |i, _| rhs[i] as f64);

        let sol = llt.solve(&rhs_f64);

        for (i, s) in solution.iter_mut().enumerate() {
            *s = sol[(i, 0)] as f32;
        }

        Ok(())
    }

    fn is_factorized(&self) -> bool {
        self.factorization.is_some()
    }
}
