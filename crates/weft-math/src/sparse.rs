//! Scalar sparse matrix representation and direct solver interface.
//!
//! The block matrix of the mass-spring system is expanded into this CSR
//! form when a direct factorization is requested.

use serde::{Deserialize, Serialize};
use weft_types::WeftResult;

/// Compressed Sparse Row (CSR) matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrMatrix {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
    /// Row pointer array (length = rows + 1).
    /// `row_ptr[i]..row_ptr[i+1]` are the indices into `col_idx` and `values`
    /// for non-zeros in row `i`.
    pub row_ptr: Vec<usize>,
    /// Column indices of non-zero entries.
    pub col_idx: Vec<usize>,
    /// Non-zero values.
    pub values: Vec<f32>,
}

impl CsrMatrix {
    /// Creates an empty CSR matrix with the given dimensions.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row_ptr: vec![0; rows + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Returns the number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Creates a CSR matrix from triplets (row, col, value).
    ///
    /// Duplicate entries are summed.
    pub fn from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, f32)]) -> Self {
        let mut row_counts = vec![0usize; rows];
        for &(r, _, _) in triplets {
            row_counts[r] += 1;
        }

        let mut row_start = vec![0usize; rows + 1];
        for i in 0..rows {
            row_start[i + 1] = row_start[i] + row_counts[i];
        }

        let mut entries = vec![(0usize, 0.0f32); row_start[rows]];
        let mut cursor = row_start[..rows].to_vec();
        for &(r, c, v) in triplets {
            entries[cursor[r]] = (c, v);
            cursor[r] += 1;
        }

        // Sort each row by column, then merge duplicates
        let mut row_ptr = Vec::with_capacity(rows + 1);
        let mut col_idx = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        row_ptr.push(0);
        for i in 0..rows {
            let row = &mut entries[row_start[i]..row_start[i + 1]];
            row.sort_by_key(|&(c, _)| c);

            let first = col_idx.len();
            for &(c, v) in row.iter() {
                if col_idx.len() > first && col_idx[col_idx.len() - 1] == c {
                    let last = values.len() - 1;
                    values[last] += v;
                } else {
                    col_idx.push(c);
                    values.push(v);
                }
            }
            row_ptr.push(col_idx.len());
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Computes `out = A x`.
    pub fn mul_vec(&self, x: &[f32], out: &mut [f32]) {
        for (row, o) in out.iter_mut().enumerate().take(self.rows) {
            let mut sum = 0.0f64;
            for idx in self.row_ptr[row]..self.row_ptr[row + 1] {
                sum += self.values[idx] as f64 * x[self.col_idx[idx]] as f64;
            }
            *o = sum as f32;
        }
    }
}

/// Trait for sparse symmetric positive-definite direct solvers.
pub trait SparseSolver {
    /// Factorize the matrix. Call again whenever the values change.
    fn factorize(&mut self, matrix: &CsrMatrix) -> WeftResult<()>;

    /// Solve Ax = b using the pre-computed factorization.
    /// Returns x in the provided output buffer.
    fn solve(&self, rhs: &[f32], solution: &mut [f32]) -> WeftResult<()>;

    /// Returns true if the solver holds a valid factorization.
    fn is_factorized(&self) -> bool;
}
