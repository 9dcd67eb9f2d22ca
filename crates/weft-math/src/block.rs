//! Block-sparse matrix of 3×3 blocks.
//!
//! Every vertex owns one diagonal block. Vertex-vertex interactions add
//! off-diagonal blocks to an append-only list; a block stored at
//! `(row, col)` stands for both `A[row][col] = m` and the mirrored
//! `A[col][row] = mᵀ`, so the sparsity pattern is symmetric by construction.
//!
//! Interactions are not deduplicated: two springs between the same pair of
//! vertices get two blocks, and products simply accumulate both. The
//! off-diagonal storage is reserved once from the spring count and reused
//! across substeps.

use glam::{Mat3, Vec3};

use crate::mat3::entry;
use crate::sparse::CsrMatrix;

/// An off-diagonal block and the vertex pair it couples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffDiagonalBlock {
    /// Row vertex.
    pub row: u32,
    /// Column vertex.
    pub col: u32,
    /// Block value for `A[row][col]`.
    pub block: Mat3,
}

/// Symmetric block-sparse matrix with 3×3 blocks.
#[derive(Debug, Clone)]
pub struct BlockMatrix {
    diagonal: Vec<Mat3>,
    off_diagonal: Vec<OffDiagonalBlock>,
}

impl BlockMatrix {
    /// Creates a zero matrix for `vertex_count` vertices with storage
    /// reserved for `off_diagonal_capacity` interaction blocks.
    pub fn new(vertex_count: usize, off_diagonal_capacity: usize) -> Self {
        Self {
            diagonal: vec![Mat3::ZERO; vertex_count],
            off_diagonal: Vec::with_capacity(off_diagonal_capacity),
        }
    }

    /// Number of vertices (diagonal blocks).
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.diagonal.len()
    }

    /// Number of off-diagonal blocks currently in use.
    #[inline]
    pub fn off_diagonal_count(&self) -> usize {
        self.off_diagonal.len()
    }

    /// Reserved off-diagonal storage.
    #[inline]
    pub fn off_diagonal_capacity(&self) -> usize {
        self.off_diagonal.capacity()
    }

    /// Zeroes the diagonal and drops all off-diagonal blocks, keeping storage.
    pub fn clear(&mut self) {
        self.diagonal.fill(Mat3::ZERO);
        self.off_diagonal.clear();
    }

    #[inline]
    pub fn diagonal(&self, vertex: usize) -> Mat3 {
        self.diagonal[vertex]
    }

    pub fn diagonals(&self) -> impl Iterator<Item = &Mat3> {
        self.diagonal.iter()
    }

    #[inline]
    pub fn set_diagonal(&mut self, vertex: usize, block: Mat3) {
        self.diagonal[vertex] = block;
    }

    #[inline]
    pub fn add_diagonal(&mut self, vertex: usize, block: Mat3) {
        self.diagonal[vertex] += block;
    }

    /// Appends a zero block coupling `row` and `col` and returns its handle.
    pub fn add_block(&mut self, row: usize, col: usize) -> usize {
        debug_assert!(row != col, "diagonal blocks are implicit");
        debug_assert!(row < self.vertex_count() && col < self.vertex_count());
        self.off_diagonal.push(OffDiagonalBlock {
            row: row as u32,
            col: col as u32,
            block: Mat3::ZERO,
        });
        self.off_diagonal.len() - 1
    }

    /// Adds `block` to the off-diagonal block behind `handle`.
    #[inline]
    pub fn add_to_block(&mut self, handle: usize, block: Mat3) {
        self.off_diagonal[handle].block += block;
    }

    #[inline]
    pub fn block(&self, handle: usize) -> &OffDiagonalBlock {
        &self.off_diagonal[handle]
    }

    pub fn off_diagonal_blocks(&self) -> &[OffDiagonalBlock] {
        &self.off_diagonal
    }

    /// Computes `out = A x`.
    pub fn mul_vec(&self, x: &[Vec3], out: &mut [Vec3]) {
        debug_assert_eq!(x.len(), self.vertex_count());
        debug_assert_eq!(out.len(), self.vertex_count());

        for ((o, d), xi) in out.iter_mut().zip(&self.diagonal).zip(x) {
            *o = *d * *xi;
        }
        for b in &self.off_diagonal {
            let (r, c) = (b.row as usize, b.col as usize);
            out[r] += b.block * x[c];
            out[c] += b.block.transpose() * x[r];
        }
    }

    /// Overwrites `self` with `sa * a + sb * b`.
    ///
    /// `a` and `b` must have been assembled in lockstep, i.e. their
    /// off-diagonal blocks couple the same vertex pairs in the same order.
    pub fn set_linear_combination(&mut self, a: &BlockMatrix, sa: f32, b: &BlockMatrix, sb: f32) {
        debug_assert_eq!(a.vertex_count(), b.vertex_count());
        debug_assert_eq!(a.off_diagonal_count(), b.off_diagonal_count());

        self.diagonal.clear();
        self.diagonal
            .extend(a.diagonal.iter().zip(&b.diagonal).map(|(x, y)| *x * sa + *y * sb));

        self.off_diagonal.clear();
        self.off_diagonal
            .extend(a.off_diagonal.iter().zip(&b.off_diagonal).map(|(x, y)| {
                debug_assert!(x.row == y.row && x.col == y.col);
                OffDiagonalBlock {
                    row: x.row,
                    col: x.col,
                    block: x.block * sa + y.block * sb,
                }
            }));
    }

    /// Builds `S A S + (I - S)` for per-vertex filter blocks `S`.
    ///
    /// With orthogonal projectors `S`, the result is positive definite
    /// whenever `A` is, and solving it yields a solution confined to the
    /// unconstrained subspace.
    pub fn projected(&self, filter: &[Mat3]) -> BlockMatrix {
        debug_assert_eq!(filter.len(), self.vertex_count());

        let diagonal = self
            .diagonal
            .iter()
            .zip(filter)
            .map(|(d, s)| *s * *d * *s + (Mat3::IDENTITY - *s))
            .collect();
        let off_diagonal = self
            .off_diagonal
            .iter()
            .map(|b| OffDiagonalBlock {
                row: b.row,
                col: b.col,
                block: filter[b.row as usize] * b.block * filter[b.col as usize],
            })
            .collect();

        BlockMatrix {
            diagonal,
            off_diagonal,
        }
    }

    /// Expands the block matrix into a scalar `3n × 3n` CSR matrix
    /// holding both triangles.
    pub fn to_csr(&self) -> CsrMatrix {
        let n = self.vertex_count() * 3;
        let mut triplets = Vec::with_capacity(9 * (self.vertex_count() + 2 * self.off_diagonal.len()));

        for (v, d) in self.diagonal.iter().enumerate() {
            push_block(&mut triplets, v, v, d);
        }
        for b in &self.off_diagonal {
            let (r, c) = (b.row as usize, b.col as usize);
            push_block(&mut triplets, r, c, &b.block);
            push_block(&mut triplets, c, r, &b.block.transpose());
        }

        CsrMatrix::from_triplets(n, n, &triplets)
    }
}

fn push_block(triplets: &mut Vec<(usize, usize, f32)>, row: usize, col: usize, m: &Mat3) {
    for r in 0..3 {
        for c in 0..3 {
            let value = entry(m, r, c);
            if value != 0.0 {
                triplets.push((row * 3 + r, col * 3 + c, value));
            }
        }
    }
}
