//! Procedural mesh generators for tests and demos.
//!
//! These generators produce deterministic, resolution-configurable meshes
//! with consistent winding order.

use weft_math::Vec3;

use crate::mesh::{ClothMesh, Face};
use crate::spring::{Spring, SpringKind};

/// Generates a flat rectangular quad grid in the XY plane.
///
/// The grid spans `[-width/2, width/2]` in X and `[-height/2, height/2]` in Y,
/// centered at the origin at Z=0. Row 0 is the top edge (`+Y`).
///
/// # Arguments
/// - `cols` — Number of quads along X (vertex count = cols + 1).
/// - `rows` — Number of quads along Y (vertex count = rows + 1).
/// - `width` — Total width in meters.
/// - `height` — Total height in meters.
///
/// # Example
/// ```
/// use weft_mesh::generators::quad_grid;
/// let mesh = quad_grid(2, 2, 1.0, 1.0);
/// assert_eq!(mesh.vertex_count(), 9);
/// assert_eq!(mesh.face_count(), 4);
/// ```
pub fn quad_grid(cols: usize, rows: usize, width: f32, height: f32) -> ClothMesh {
    let verts_x = cols + 1;
    let verts_y = rows + 1;
    let half_w = width / 2.0;
    let half_h = height / 2.0;

    let mut positions = Vec::with_capacity(verts_x * verts_y);
    for j in 0..verts_y {
        for i in 0..verts_x {
            let u = i as f32 / cols.max(1) as f32;
            let v = j as f32 / rows.max(1) as f32;
            positions.push(Vec3::new(-half_w + u * width, half_h - v * height, 0.0));
        }
    }

    let mut faces = Vec::with_capacity(cols * rows);
    for j in 0..rows {
        for i in 0..cols {
            let top_left = (j * verts_x + i) as u32;
            let top_right = top_left + 1;
            let bot_left = top_left + verts_x as u32;
            let bot_right = bot_left + 1;
            faces.push(Face::Quad([top_left, bot_left, bot_right, top_right]));
        }
    }

    ClothMesh { positions, faces }
}

/// Same layout as [`quad_grid`] with each quad split into two triangles.
pub fn triangle_grid(cols: usize, rows: usize, width: f32, height: f32) -> ClothMesh {
    let mut mesh = quad_grid(cols, rows, width, height);
    mesh.faces = mesh
        .faces
        .iter()
        .flat_map(|face| match *face {
            Face::Quad([a, b, c, d]) => [Face::Triangle([a, b, d]), Face::Triangle([d, b, c])],
            tri => [tri, tri],
        })
        .collect();
    mesh
}

/// Generates a straight hair strand and its springs.
///
/// Vertex 0 is the root and carries a goal spring. Consecutive vertices
/// are joined by structural springs and every interior vertex carries an
/// angular bending spring whose target keeps the strand straight.
pub fn hair_strand(
    root: Vec3,
    direction: Vec3,
    segments: usize,
    segment_length: f32,
) -> (ClothMesh, Vec<Spring>) {
    let dir = direction.normalize_or(Vec3::NEG_Z);
    let positions: Vec<Vec3> = (0..=segments)
        .map(|i| root + dir * (i as f32 * segment_length))
        .collect();

    let mut springs = Vec::with_capacity(segments * 2 + 1);
    springs.push(Spring::new(SpringKind::Goal { vertex: 0 }, 0.0));
    for i in 0..segments as u32 {
        springs.push(Spring::new(
            SpringKind::Structural { ij: i, kl: i + 1 },
            segment_length,
        ));
    }
    for i in 1..segments as u32 {
        springs.push(Spring::new(
            SpringKind::BendingAngular {
                ij: i - 1,
                kl: i,
                mn: i + 1,
                target: dir,
            },
            segment_length,
        ));
    }

    (
        ClothMesh {
            positions,
            faces: Vec::new(),
        },
        springs,
    )
}
