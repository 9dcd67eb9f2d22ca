//! Cloth mesh: positions and faces.

use serde::{Deserialize, Serialize};
use weft_math::Vec3;
use weft_types::{WeftError, WeftResult};

/// A mesh face. Quads keep their winding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Face {
    Triangle([u32; 3]),
    Quad([u32; 4]),
}

impl Face {
    /// Vertex indices in winding order.
    pub fn vertices(&self) -> &[u32] {
        match self {
            Face::Triangle(v) => v,
            Face::Quad(v) => v,
        }
    }

    /// Boundary edges in winding order.
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let v = self.vertices();
        (0..v.len()).map(move |i| (v[i], v[(i + 1) % v.len()]))
    }
}

/// Vertex positions plus faces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClothMesh {
    /// Rest positions of all vertices.
    pub positions: Vec<Vec3>,
    /// Faces; empty for hair.
    pub faces: Vec<Face>,
}

impl ClothMesh {
    /// Creates a mesh from positions and faces and validates it.
    pub fn new(positions: Vec<Vec3>, faces: Vec<Face>) -> WeftResult<Self> {
        let mesh = Self { positions, faces };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Returns the number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Returns the number of faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Validates mesh integrity.
    ///
    /// Checks:
    /// - Face indices are within bounds
    /// - No degenerate faces (repeated vertex indices)
    /// - Positions are finite
    pub fn validate(&self) -> WeftResult<()> {
        let n = self.positions.len();

        if let Some(i) = self.positions.iter().position(|p| !p.is_finite()) {
            return Err(WeftError::InvalidInput(format!(
                "Vertex {i} has a non-finite position"
            )));
        }

        for (f, face) in self.faces.iter().enumerate() {
            let verts = face.vertices();
            for &idx in verts {
                if idx as usize >= n {
                    return Err(WeftError::InvalidTopology(format!(
                        "Face {f} references vertex {idx} (vertex count: {n})"
                    )));
                }
            }
            for a in 0..verts.len() {
                for b in a + 1..verts.len() {
                    if verts[a] == verts[b] {
                        return Err(WeftError::InvalidTopology(format!(
                            "Face {f} has repeated vertex index {}",
                            verts[a]
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
