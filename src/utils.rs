use crate::body::{BodyParams, ShipDrag};
use std::sync::Arc;
use ultraviolet::Vec2;

/// Euclidean modulo, always in `[0, b)` for positive `b`.
#[inline]
pub fn umod(a: f32, b: f32) -> f32 {
    a.rem_euclid(b)
}

/// Wraps an angle into `[0, 2π)`.
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = umod(angle, std::f32::consts::TAU);
    // rem_euclid may round up to the modulus itself
    if wrapped >= std::f32::consts::TAU { 0.0 } else { wrapped }
}

/// Signed shortest angular difference from `from` to `to`, in `[-π, π)`.
#[inline]
pub fn ang_diff(from: f32, to: f32) -> f32 {
    umod(to - from + std::f32::consts::PI, std::f32::consts::TAU) - std::f32::consts::PI
}

#[inline]
pub fn lerp(a: f32, b: f32, alpha: f32) -> f32 {
    (b - a) * alpha + a
}

/// Inverse of [`lerp`], with `val` clamped into `[a, b]`.
#[inline]
pub fn unlerp(a: f32, b: f32, val: f32) -> f32 {
    let clamped = val.max(a.min(b)).min(a.max(b));
    (clamped - a) / (b - a)
}

/// Unit vector along `v`, or zero when `v` has no usable direction.
#[inline]
pub fn normalize_or_zero(v: Vec2) -> Vec2 {
    let mag = v.mag();
    if mag > f32::EPSILON && mag.is_finite() {
        v / mag
    } else {
        Vec2::zero()
    }
}

/// Z component of the 3D cross product of two planar vectors.
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Unit vector pointing along `angle`.
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(cos, sin)
}

/// Generates `n` bodies scattered over a disc of the given radius, suitable
/// for benchmarks and soak tests.
/// - Every fourth body is a ship-sized hull with anisotropic drag.
/// - The rest are small crates and shots drifting with random velocities.
/// - Seeded, so two calls with the same arguments produce the same scene.
pub fn scatter_fleet(n: usize, radius: f32) -> Vec<(Vec2, BodyParams)> {
    let mut rng = fastrand::Rng::with_seed(0);
    let mut bodies = Vec::with_capacity(n);

    for i in 0..n {
        let a = rng.f32() * std::f32::consts::TAU;
        // Uniform area distribution
        let r = rng.f32().sqrt() * radius;
        let pos = heading(a) * r;
        let vel = heading(rng.f32() * std::f32::consts::TAU) * rng.f32() * 4.0;

        let params = if i % 4 == 0 {
            BodyParams {
                size: 14.0,
                weight: 400.0,
                angle: rng.f32() * std::f32::consts::TAU,
                base_friction: 0.005,
                velocity: vel,
                drag: Some(Arc::new(ShipDrag::new(2.0))),
                ..BodyParams::default()
            }
        } else {
            BodyParams {
                size: 2.0 + rng.f32() * 6.0,
                weight: 0.5 + rng.f32() * 4.0,
                velocity: vel,
                ..BodyParams::default()
            }
        };

        bodies.push((pos, params));
    }

    bodies
}
