//! Mesh topology and spring derivation.
//!
//! Builds the edge adjacency of a [`ClothMesh`] and derives the spring
//! set from it: structural springs on edges, shear springs on quad
//! diagonals and bending springs across interior edges.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::mesh::{ClothMesh, Face};
use crate::spring::{Spring, SpringKind};

/// Which spring families [`SpringTopology::springs`] emits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringOptions {
    /// Shear springs across quad diagonals.
    pub shear: bool,
    /// Bending springs across interior edges.
    pub bending: bool,
    /// One goal spring per vertex.
    pub goal: bool,
}

impl Default for SpringOptions {
    fn default() -> Self {
        Self {
            shear: true,
            bending: true,
            goal: false,
        }
    }
}

/// Precomputed topology information for a cloth mesh.
///
/// Edge iteration order is sorted by vertex pair, so the derived spring
/// order is stable across runs.
#[derive(Debug, Clone)]
pub struct SpringTopology {
    /// Unique edges as `(v_min, v_max)` pairs.
    pub edges: Vec<[u32; 2]>,

    /// For each edge, the one or two adjacent faces.
    pub edge_faces: Vec<Vec<u32>>,

    /// Edges shared by exactly two faces.
    pub interior_edges: Vec<InteriorEdge>,
}

/// An interior edge with one wing vertex taken from each adjacent face.
///
/// For triangles the wing is the vertex opposite the edge. For quads it
/// is the neighbor of `v0` that is not `v1`, so the bending spring spans
/// two grid cells in a straight line.
#[derive(Debug, Clone, Copy)]
pub struct InteriorEdge {
    pub v0: u32,
    pub v1: u32,
    pub wing_a: u32,
    pub wing_b: u32,
}

impl SpringTopology {
    /// Build topology from a mesh.
    pub fn build(mesh: &ClothMesh) -> Self {
        let mut edge_map: BTreeMap<(u32, u32), Vec<u32>> = BTreeMap::new();

        for (f, face) in mesh.faces.iter().enumerate() {
            for (v0, v1) in face.edges() {
                let key = if v0 < v1 { (v0, v1) } else { (v1, v0) };
                edge_map.entry(key).or_default().push(f as u32);
            }
        }

        let mut edges = Vec::with_capacity(edge_map.len());
        let mut edge_faces = Vec::with_capacity(edge_map.len());
        let mut interior_edges = Vec::new();

        for ((v0, v1), faces) in edge_map {
            edges.push([v0, v1]);

            if let [fa, fb] = faces[..] {
                let wing_a = find_wing_vertex(&mesh.faces[fa as usize], v0, v1);
                let wing_b = find_wing_vertex(&mesh.faces[fb as usize], v0, v1);
                interior_edges.push(InteriorEdge {
                    v0,
                    v1,
                    wing_a,
                    wing_b,
                });
            }
            edge_faces.push(faces);
        }

        Self {
            edges,
            edge_faces,
            interior_edges,
        }
    }

    /// Returns the number of boundary edges (edges with only 1 adjacent face).
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_faces.iter().filter(|f| f.len() == 1).count()
    }

    /// Derives the spring set.
    ///
    /// Rest lengths are measured on the mesh positions. Pairs already
    /// joined by a structural or shear spring never get a bending spring.
    pub fn springs(&self, mesh: &ClothMesh, options: SpringOptions) -> Vec<Spring> {
        let rest = |a: u32, b: u32| mesh.positions[a as usize].distance(mesh.positions[b as usize]);
        let mut connected: BTreeSet<(u32, u32)> = BTreeSet::new();
        let mut springs = Vec::new();

        for &[ij, kl] in &self.edges {
            connected.insert((ij, kl));
            springs.push(Spring::new(SpringKind::Structural { ij, kl }, rest(ij, kl)));
        }

        if options.shear {
            for face in &mesh.faces {
                if let Face::Quad([a, b, c, d]) = *face {
                    for (ij, kl) in [(a, c), (b, d)] {
                        if connected.insert(ordered(ij, kl)) {
                            springs.push(Spring::new(SpringKind::Shear { ij, kl }, rest(ij, kl)));
                        }
                    }
                }
            }
        }

        if options.bending {
            for edge in &self.interior_edges {
                let (ij, kl) = (edge.wing_a, edge.wing_b);
                if ij != kl && connected.insert(ordered(ij, kl)) {
                    springs.push(Spring::new(SpringKind::Bending { ij, kl }, rest(ij, kl)));
                }
            }
        }

        if options.goal {
            springs.extend(
                (0..mesh.vertex_count() as u32)
                    .map(|vertex| Spring::new(SpringKind::Goal { vertex }, 0.0)),
            );
        }

        springs
    }
}

fn ordered(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Find the wing vertex of `face` relative to edge `(v0, v1)`.
fn find_wing_vertex(face: &Face, v0: u32, v1: u32) -> u32 {
    let verts = face.vertices();
    match face {
        Face::Triangle(_) => verts
            .iter()
            .copied()
            .find(|&v| v != v0 && v != v1)
            .unwrap_or(v0),
        Face::Quad(_) => {
            let n = verts.len();
            let at = verts.iter().position(|&v| v == v0).unwrap_or(0);
            let prev = verts[(at + n - 1) % n];
            let next = verts[(at + 1) % n];
            if next == v1 {
                prev
            } else {
                next
            }
        }
    }
}
