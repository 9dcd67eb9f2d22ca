//! Force models.
//!
//! Every model is a pure function of positions and velocities returning
//! the force together with its Jacobians. For two-vertex springs `f` is
//! the force on the first vertex (the second receives `-f`), `dfdx` and
//! `dfdv` are the derivatives of that force with respect to the first
//! vertex's own position and velocity.

use weft_math::mat3::{normalize_with_length, outer};
use weft_math::{Mat3, Vec3};
use weft_types::constants::{ALMOST_ZERO, ANGULAR_FD_DELTA, EDGE_WIND_SCALE, FACE_WIND_SCALE};

/// Force and Jacobians of a spring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringForce {
    pub f: Vec3,
    pub dfdx: Mat3,
    pub dfdv: Mat3,
}

/// Jacobian of a linear spring force with respect to its own endpoint.
fn dfdx_spring(dir: Vec3, length: f32, rest_length: f32, k: f32) -> Mat3 {
    ((Mat3::IDENTITY - outer(dir, dir)) * (rest_length / length) - Mat3::IDENTITY) * k
}

fn dfdv_damp(dir: Vec3, damping: f32) -> Mat3 {
    outer(dir, dir) * -damping
}

/// Linear distance spring between `i` and `j`.
///
/// With `no_compress` set the spring only acts while stretched. A positive
/// `max_force` clamps the stretch force. Returns `None` for inactive or
/// degenerate (zero-length) springs.
#[allow(clippy::too_many_arguments)]
pub fn spring_linear(
    xi: Vec3,
    xj: Vec3,
    vi: Vec3,
    vj: Vec3,
    rest_length: f32,
    k: f32,
    damping: f32,
    no_compress: bool,
    max_force: f32,
) -> Option<SpringForce> {
    let (dir, length) = normalize_with_length(xj - xi, ALMOST_ZERO);
    if length <= ALMOST_ZERO || (no_compress && length <= rest_length) {
        return None;
    }

    let mut stretch = k * (length - rest_length);
    if max_force > 0.0 && stretch > max_force {
        stretch = max_force;
    }
    let vel = vj - vi;

    Some(SpringForce {
        f: dir * stretch + dir * (damping * vel.dot(dir)),
        dfdx: dfdx_spring(dir, length, rest_length, k),
        dfdv: dfdv_damp(dir, damping),
    })
}

/// Zero-rest-length spring pulling a vertex toward a moving goal.
pub fn spring_goal(
    x: Vec3,
    v: Vec3,
    goal_x: Vec3,
    goal_v: Vec3,
    k: f32,
    friction: f32,
) -> Option<SpringForce> {
    let (dir, length) = normalize_with_length(goal_x - x, ALMOST_ZERO);
    if length <= ALMOST_ZERO {
        return None;
    }
    let vel = goal_v - v;

    Some(SpringForce {
        f: dir * (k * length) + dir * (friction * vel.dot(dir)),
        dfdx: dfdx_spring(dir, length, 0.0, k),
        dfdv: dfdv_damp(dir, friction),
    })
}

/// Bending resistance curve of Choi & Ko, fitted over `x = length / rest`.
pub fn bending_fb(x: f32) -> f32 {
    let x2 = x * x;
    let x3 = x2 * x;
    let x4 = x3 * x;
    -11.541 * x4 + 34.193 * x3 - 39.083 * x2 + 23.116 * x - 9.713
}

/// Derivative of [`bending_fb`] with respect to `x`.
pub fn bending_fb_derivative(x: f32) -> f32 {
    let x2 = x * x;
    let x3 = x2 * x;
    -46.164 * x3 + 102.579 * x2 - 78.166 * x + 23.116
}

/// Buckling force: the larger of the curve force and the linear damping term.
pub fn bending_fbstar(length: f32, rest_length: f32, kb: f32, cb: f32) -> f32 {
    let curve = kb * bending_fb(length / rest_length);
    let linear = cb * (length - rest_length);
    if curve < linear {
        linear
    } else {
        curve
    }
}

/// Jacobian factor matching the branch taken by [`bending_fbstar`].
pub fn bending_fbstar_jacobian(length: f32, rest_length: f32, kb: f32, cb: f32) -> f32 {
    let curve = kb * bending_fb(length / rest_length);
    let linear = cb * (length - rest_length);
    if curve < linear {
        -cb
    } else {
        -kb * bending_fb_derivative(length / rest_length)
    }
}

/// Linear bending spring; only resists compression below `rest_length`.
pub fn spring_bending(xi: Vec3, xj: Vec3, rest_length: f32, kb: f32, cb: f32) -> Option<SpringForce> {
    let (dir, length) = normalize_with_length(xj - xi, ALMOST_ZERO);
    if length <= ALMOST_ZERO || length >= rest_length {
        return None;
    }

    Some(SpringForce {
        f: dir * bending_fbstar(length, rest_length, kb, cb),
        dfdx: outer(dir, dir) * bending_fbstar_jacobian(length, rest_length, kb, cb),
        dfdv: Mat3::ZERO,
    })
}

/// Forces and Jacobians of an angular bending spring over `(i, j, k)`.
///
/// Only `j` and `k` receive force. Jacobian names read
/// `d<force>_d<variable>`, e.g. `dfk_dxj = ∂f_k/∂x_j`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularForce {
    pub fj: Vec3,
    pub fk: Vec3,
    pub dfj_dxi: Mat3,
    pub dfj_dxj: Mat3,
    pub dfk_dxi: Mat3,
    pub dfk_dxj: Mat3,
    pub dfk_dxk: Mat3,
    pub dfj_dvi: Mat3,
    pub dfj_dvj: Mat3,
    pub dfk_dvi: Mat3,
    pub dfk_dvj: Mat3,
    pub dfk_dvk: Mat3,
}

/// Force on `k`: pulls the segment `j→k` toward `goal_dir · |x_k - x_j|`
/// and damps its rotation.
fn angular_fk(x: [Vec3; 3], v: [Vec3; 3], goal_dir: Vec3, stiffness: f32, damping: f32) -> Vec3 {
    let edge_jk = x[2] - x[1];
    let (dir_jk, length) = normalize_with_length(edge_jk, ALMOST_ZERO);
    let goal = goal_dir * length;

    let vel_jk = v[2] - v[1];
    let vel_ortho = vel_jk - dir_jk * vel_jk.dot(dir_jk);

    (goal - edge_jk) * stiffness - vel_ortho * damping
}

/// Central-difference Jacobian; column `a` is `∂f/∂u_a`.
fn estimate_jacobian(f: impl Fn(Vec3) -> Vec3) -> Mat3 {
    let h = ANGULAR_FD_DELTA;
    let column = |axis: Vec3| (f(axis * (0.5 * h)) - f(axis * (-0.5 * h))) / h;
    Mat3::from_cols(column(Vec3::X), column(Vec3::Y), column(Vec3::Z))
}

/// Angular bending spring over the segments `i→j` and `j→k`.
///
/// `goal_dir` is the rest direction of `j→k` in world space; a straight
/// configuration aligned with it produces no force at any segment length.
pub fn spring_bending_angular(
    x: [Vec3; 3],
    v: [Vec3; 3],
    goal_dir: Vec3,
    stiffness: f32,
    damping: f32,
) -> AngularForce {
    let fk = angular_fk(x, v, goal_dir, stiffness, damping);

    let dx = |q: usize| {
        estimate_jacobian(|d| {
            let mut xp = x;
            xp[q] += d;
            angular_fk(xp, v, goal_dir, stiffness, damping)
        })
    };
    let dv = |q: usize| {
        estimate_jacobian(|d| {
            let mut vp = v;
            vp[q] += d;
            angular_fk(x, vp, goal_dir, stiffness, damping)
        })
    };

    let (dfk_dxi, dfk_dxj, dfk_dxk) = (dx(0), dx(1), dx(2));
    let (dfk_dvi, dfk_dvj, dfk_dvk) = (dv(0), dv(1), dv(2));

    // f_j = -f_k
    AngularForce {
        fj: -fk,
        fk,
        dfj_dxi: -dfk_dxi,
        dfj_dxj: -dfk_dxj,
        dfk_dxi,
        dfk_dxj,
        dfk_dxk,
        dfj_dvi: -dfk_dvi,
        dfj_dvj: -dfk_dvj,
        dfk_dvi,
        dfk_dvj,
        dfk_dvk,
    }
}

/// Wind on a triangle or quad face.
///
/// Each corner gets the normal component of its own wind sample,
/// weighted by an equal share of the face area. `corners` and `winds`
/// have length 3 or 4; unused output slots stay zero.
pub fn face_wind(corners: &[Vec3], winds: &[Vec3]) -> [Vec3; 4] {
    let mut out = [Vec3::ZERO; 4];

    let (cross, share) = match corners {
        [a, b, c] => ((*b - *a).cross(*c - *a), 1.0 / 3.0),
        [a, b, c, d] => ((*c - *a).cross(*d - *b), 0.25),
        _ => return out,
    };
    let (normal, twice_area) = normalize_with_length(cross, ALMOST_ZERO);
    let factor = FACE_WIND_SCALE * 0.5 * twice_area * share;

    for (o, w) in out.iter_mut().zip(winds) {
        *o = normal * (factor * w.dot(normal));
    }
    out
}

/// Wind on a hair segment: the part of each endpoint's wind orthogonal
/// to the segment, scaled by the segment length.
pub fn edge_wind(x1: Vec3, x2: Vec3, w1: Vec3, w2: Vec3) -> (Vec3, Vec3) {
    let (dir, length) = normalize_with_length(x1 - x2, ALMOST_ZERO);
    let scale = EDGE_WIND_SCALE * length;
    let ortho = |w: Vec3| (w - dir * w.dot(dir)) * scale;
    (ortho(w1), ortho(w2))
}
