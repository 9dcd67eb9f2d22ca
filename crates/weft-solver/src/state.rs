//! Vertex state table and solver index assignment.
//!
//! The table is indexed by authoring-mesh vertex. Only non-excluded
//! vertices take part in the solve; they get a dense [`SolverIndex`].

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use weft_math::{Mat3, Vec3};
use weft_types::{SolverIndex, VertexId};

bitflags! {
    /// Per-vertex simulation flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct VertexFlags: u8 {
        /// Position follows the goal target; velocity is constrained.
        const PINNED = 1 << 0;
        /// Not simulated at all.
        const EXCLUDED = 1 << 1;
    }
}

/// One authoring vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClothVertex {
    pub mass: f32,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Goal target at the start of the frame.
    pub rest_position: Vec3,
    /// Goal target at the end of the frame.
    pub target_position: Vec3,
    /// Goal spring weight in [0, 1].
    pub goal: f32,
    /// Reference frame for angular bending targets.
    pub rest_orientation: Mat3,
    pub flags: VertexFlags,
    /// `None` while excluded.
    pub solver_index: Option<SolverIndex>,
    /// Collision constraints received in the current substep.
    pub impulse_count: u32,
}

impl ClothVertex {
    /// A free vertex at rest at `position`.
    pub fn new(position: Vec3, mass: f32) -> Self {
        Self {
            mass,
            position,
            velocity: Vec3::ZERO,
            rest_position: position,
            target_position: position,
            goal: 0.0,
            rest_orientation: Mat3::IDENTITY,
            flags: VertexFlags::empty(),
            solver_index: None,
            impulse_count: 0,
        }
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.flags.contains(VertexFlags::PINNED)
    }

    #[inline]
    pub fn is_excluded(&self) -> bool {
        self.flags.contains(VertexFlags::EXCLUDED)
    }
}

/// Bijection between non-excluded vertices and dense solver indices.
///
/// Indices follow vertex order. When every vertex is excluded the map
/// still reports an active count of 1: the solver keeps a placeholder
/// slot that no vertex maps to.
#[derive(Debug, Clone, Default)]
pub struct SolverIndexMap {
    to_solver: Vec<Option<SolverIndex>>,
    to_vertex: Vec<VertexId>,
}

impl SolverIndexMap {
    /// Assigns solver indices and writes them into the vertices.
    pub fn assign(vertices: &mut [ClothVertex]) -> Self {
        let mut to_solver = Vec::with_capacity(vertices.len());
        let mut to_vertex = Vec::with_capacity(vertices.len());

        for (i, vertex) in vertices.iter_mut().enumerate() {
            let index = (!vertex.is_excluded()).then(|| {
                to_vertex.push(VertexId(i as u32));
                SolverIndex((to_vertex.len() - 1) as u32)
            });
            vertex.solver_index = index;
            to_solver.push(index);
        }

        Self {
            to_solver,
            to_vertex,
        }
    }

    /// Number of vertices with a solver index.
    pub fn assigned_count(&self) -> usize {
        self.to_vertex.len()
    }

    /// Size of the solver system, never below 1.
    pub fn active_count(&self) -> usize {
        self.assigned_count().max(1)
    }

    /// True if only the placeholder slot exists.
    pub fn is_placeholder(&self) -> bool {
        self.to_vertex.is_empty()
    }

    pub fn solver_index(&self, vertex: VertexId) -> Option<SolverIndex> {
        self.to_solver.get(vertex.index()).copied().flatten()
    }

    pub fn vertex(&self, index: SolverIndex) -> Option<VertexId> {
        self.to_vertex.get(index.index()).copied()
    }

    /// Iterates `(vertex, solver index)` over assigned vertices.
    pub fn iter(&self) -> impl Iterator<Item = (VertexId, SolverIndex)> + '_ {
        self.to_vertex
            .iter()
            .enumerate()
            .map(|(s, v)| (*v, SolverIndex(s as u32)))
    }
}
