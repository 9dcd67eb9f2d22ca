//! External force collaborators.
//!
//! The driver samples a [`ForceField`] for wind and a [`VolumeField`] for
//! hair volume forces. Both are injected per frame through the solve
//! context. [`UniformWind`] and [`VelocityGrid`] are simple in-crate
//! implementations.

use weft_math::{Mat3, Vec3};
use weft_types::VertexId;

/// Per-point effector sample, e.g. wind.
pub trait ForceField {
    /// Wind vector acting at `position` on `vertex`.
    fn sample(&self, vertex: VertexId, position: Vec3, velocity: Vec3) -> Vec3;

    /// Returns the field name (for logs).
    fn name(&self) -> &str {
        "force_field"
    }
}

/// Constant wind everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformWind {
    pub wind: Vec3,
}

impl UniformWind {
    pub fn new(wind: Vec3) -> Self {
        Self { wind }
    }
}

impl ForceField for UniformWind {
    fn sample(&self, _vertex: VertexId, _position: Vec3, _velocity: Vec3) -> Vec3 {
        self.wind
    }

    fn name(&self) -> &str {
        "uniform_wind"
    }
}

/// Force and Jacobians sampled from a volume field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceSample {
    pub force: Vec3,
    pub dfdx: Mat3,
    pub dfdv: Mat3,
}

impl ForceSample {
    pub const ZERO: Self = Self {
        force: Vec3::ZERO,
        dfdx: Mat3::ZERO,
        dfdv: Mat3::ZERO,
    };
}

/// Volumetric hair field rebuilt every substep.
pub trait VolumeField {
    /// Rebuilds the field over the box `[min, max]` from `(position, velocity)` points.
    fn build(&mut self, resolution: u32, min: Vec3, max: Vec3, points: &[(Vec3, Vec3)]);

    /// Samples the force on a point moving with `velocity` at `position`.
    ///
    /// `smoothing` pulls the velocity toward the local average; `pressure`
    /// pushes out of regions denser than `min_pressure`.
    fn forces(&self, position: Vec3, velocity: Vec3, smoothing: f32, pressure: f32, min_pressure: f32) -> ForceSample;
}

/// Trilinear density/velocity grid.
#[derive(Debug, Clone, Default)]
pub struct VelocityGrid {
    resolution: usize,
    origin: Vec3,
    cell: Vec3,
    density: Vec<f32>,
    velocity: Vec<Vec3>,
}

const MAX_RESOLUTION: u32 = 128;
const MIN_EXTENT: f32 = 1e-4;

impl VelocityGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes per axis of the last build (0 before the first build).
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    #[inline]
    fn node(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.resolution + y) * self.resolution + x
    }

    /// Base node and fractional offsets of `p`, or `None` outside the grid.
    fn locate(&self, p: Vec3) -> Option<([usize; 3], Vec3)> {
        if self.resolution < 2 {
            return None;
        }
        let g = (p - self.origin) / self.cell;
        let last = (self.resolution - 1) as f32;
        if !g.is_finite() || g.min_element() < 0.0 || g.max_element() > last {
            return None;
        }
        let base = g.floor().min(Vec3::splat(last - 1.0));
        let frac = g - base;
        Some(([base.x as usize, base.y as usize, base.z as usize], frac))
    }

    /// The 8 corner nodes around `base` with their trilinear weights.
    fn corners(&self, base: [usize; 3], t: Vec3) -> [(usize, f32, Vec3); 8] {
        let mut out = [(0, 0.0, Vec3::ZERO); 8];
        for (c, slot) in out.iter_mut().enumerate() {
            let (dx, dy, dz) = (c & 1, (c >> 1) & 1, (c >> 2) & 1);
            let wx = if dx == 1 { t.x } else { 1.0 - t.x };
            let wy = if dy == 1 { t.y } else { 1.0 - t.y };
            let wz = if dz == 1 { t.z } else { 1.0 - t.z };
            let sx = if dx == 1 { 1.0 } else { -1.0 };
            let sy = if dy == 1 { 1.0 } else { -1.0 };
            let sz = if dz == 1 { 1.0 } else { -1.0 };
            // Weight gradient in world units.
            let grad = Vec3::new(sx * wy * wz, wx * sy * wz, wx * wy * sz) / self.cell;
            *slot = (
                self.node(base[0] + dx, base[1] + dy, base[2] + dz),
                wx * wy * wz,
                grad,
            );
        }
        out
    }

    /// Density at `p` (0 outside the grid).
    pub fn density_at(&self, p: Vec3) -> f32 {
        self.locate(p).map_or(0.0, |(base, t)| {
            self.corners(base, t)
                .iter()
                .map(|&(n, w, _)| w * self.density[n])
                .sum()
        })
    }

    /// Averaged velocity at `p` (zero outside the grid).
    pub fn velocity_at(&self, p: Vec3) -> Vec3 {
        self.locate(p).map_or(Vec3::ZERO, |(base, t)| {
            self.corners(base, t)
                .iter()
                .map(|&(n, w, _)| self.velocity[n] * w)
                .sum()
        })
    }
}

impl VolumeField for VelocityGrid {
    fn build(&mut self, resolution: u32, min: Vec3, max: Vec3, points: &[(Vec3, Vec3)]) {
        let res = resolution.clamp(2, MAX_RESOLUTION) as usize;
        self.resolution = res;
        self.origin = min;
        self.cell = ((max - min).max(Vec3::splat(MIN_EXTENT))) / (res - 1) as f32;
        self.density.clear();
        self.density.resize(res * res * res, 0.0);
        self.velocity.clear();
        self.velocity.resize(res * res * res, Vec3::ZERO);

        for &(p, v) in points {
            let Some((base, t)) = self.locate(p) else {
                continue;
            };
            for (n, w, _) in self.corners(base, t) {
                self.density[n] += w;
                self.velocity[n] += v * w;
            }
        }
        for (v, &d) in self.velocity.iter_mut().zip(&self.density) {
            if d > 0.0 {
                *v /= d;
            }
        }
    }

    fn forces(&self, position: Vec3, velocity: Vec3, smoothing: f32, pressure: f32, min_pressure: f32) -> ForceSample {
        let Some((base, t)) = self.locate(position) else {
            return ForceSample::ZERO;
        };
        let corners = self.corners(base, t);

        let mut density = 0.0;
        let mut gradient = Vec3::ZERO;
        let mut average = Vec3::ZERO;
        for &(n, w, g) in &corners {
            density += w * self.density[n];
            gradient += g * self.density[n];
            average += self.velocity[n] * w;
        }

        let mut sample = ForceSample {
            force: (average - velocity) * smoothing,
            dfdx: Mat3::ZERO,
            dfdv: Mat3::IDENTITY * -smoothing,
        };
        if pressure > 0.0 && density > min_pressure {
            sample.force -= gradient * pressure;
        }
        sample
    }
}
