//! Strongly-typed identifiers.
//!
//! Newtype wrappers keep indices into the authoring mesh apart from
//! dense indices into the linear system.

use serde::{Deserialize, Serialize};

/// Index of a vertex in the authoring mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub u32);

/// Dense index of an active vertex in the linear system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SolverIndex(pub u32);

impl VertexId {
    /// Returns the raw index as `usize` for array indexing.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl SolverIndex {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for VertexId {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<u32> for SolverIndex {
    fn from(val: u32) -> Self {
        Self(val)
    }
}
