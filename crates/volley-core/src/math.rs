use nalgebra::{Matrix3, Rotation3};

use crate::{CarData, Orientation, Vector3};

/// Projects a vector onto the ground plane.
pub fn ground(v: &Vector3) -> Vector3 {
    Vector3::new(v.x, v.y, 0.0)
}

/// Unit vector pointing from `from` to `to`, or zero if the points coincide.
pub fn direction(from: &Vector3, to: &Vector3) -> Vector3 {
    (to - from).try_normalize(1e-9).unwrap_or_else(Vector3::zeros)
}

/// Unit vector pointing from `from` to `to` in the ground plane, or zero if one
/// point is directly above the other.
pub fn ground_direction(from: &Vector3, to: &Vector3) -> Vector3 {
    direction(&ground(from), &ground(to))
}

pub fn distance(a: &Vector3, b: &Vector3) -> f64 {
    (b - a).norm()
}

/// Distance between two points, ignoring the vertical offset.
pub fn ground_distance(a: &Vector3, b: &Vector3) -> f64 {
    (ground(b) - ground(a)).norm()
}

/// Unsigned angle between two vectors in radians. Zero vectors yield zero.
pub fn angle_between(a: &Vector3, b: &Vector3) -> f64 {
    match (a.try_normalize(1e-9), b.try_normalize(1e-9)) {
        (Some(a), Some(b)) => a.dot(&b).clamp(-1.0, 1.0).acos(),
        _ => 0.0,
    }
}

/// Unsigned angle between the car's heading and the ground direction to `target`.
pub fn angle_to(car: &CarData, target: &Vector3) -> f64 {
    angle_between(
        &ground(&car.forward()),
        &ground_direction(&car.position, target),
    )
}

/// Maps `x` linearly from `[a, b]` to `[c, d]`, clamping `x` to `[a, b]` first.
pub fn range_map(x: f64, a: f64, b: f64, c: f64, d: f64) -> f64 {
    if (b - a).abs() < f64::EPSILON {
        return c;
    }
    let x = x.clamp(a.min(b), a.max(b));
    c + (x - a) / (b - a) * (d - c)
}

/// Orientation whose forward axis points along `direction` and whose roof is as
/// close to `up` as possible.
///
/// If `up` is parallel to `direction`, the world `z` axis (or `x` axis for vertical
/// directions) is used as the up hint instead.
pub fn look_at(direction: &Vector3, up: &Vector3) -> Orientation {
    let forward = match direction.try_normalize(1e-9) {
        Some(f) => f,
        None => return Orientation::identity(),
    };
    let left = up
        .cross(&forward)
        .try_normalize(1e-6)
        .or_else(|| Vector3::z().cross(&forward).try_normalize(1e-6))
        .or_else(|| Vector3::x().cross(&forward).try_normalize(1e-6))
        .unwrap_or_else(Vector3::y);
    let roof = forward.cross(&left);
    let basis = Matrix3::from_columns(&[forward, left, roof]);
    Orientation::from_rotation_matrix(&Rotation3::from_matrix_unchecked(basis))
}

/// Rotation about `axis` by an angle equal to its length.
pub fn axis_to_rotation(axis: &Vector3) -> Orientation {
    Orientation::from_scaled_axis(*axis)
}
