//! Small vector/matrix helpers on top of `glam`.

use glam::{Mat3, Vec3};

/// Outer product `a bᵀ`.
#[inline]
pub fn outer(a: Vec3, b: Vec3) -> Mat3 {
    Mat3::from_cols(a * b.x, a * b.y, a * b.z)
}

/// Linear interpolation `(1 - t) a + t b`.
///
/// Written in this form so `t == 1` yields `b` exactly.
#[inline]
pub fn interp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a * (1.0 - t) + b * t
}

/// Returns true if every entry of `m` is finite.
#[inline]
pub fn is_finite_mat3(m: &Mat3) -> bool {
    m.x_axis.is_finite() && m.y_axis.is_finite() && m.z_axis.is_finite()
}

/// Entry `(row, col)` of a column-major `Mat3`.
#[inline]
pub fn entry(m: &Mat3, row: usize, col: usize) -> f32 {
    m.col(col)[row]
}

/// Normalizes `v`, returning the unit vector and the original length.
///
/// Vectors shorter than `eps` yield `(Vec3::ZERO, length)`.
#[inline]
pub fn normalize_with_length(v: Vec3, eps: f32) -> (Vec3, f32) {
    let length = v.length();
    if length > eps {
        (v / length, length)
    } else {
        (Vec3::ZERO, length)
    }
}
