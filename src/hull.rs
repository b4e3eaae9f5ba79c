use crate::{
    body::Body,
    utils::{heading, lerp},
};

use ultraviolet::Vec2;

/// Bodies whose altitudes differ by more than this sit on different vertical
/// layers and never touch.
pub const LAYER_TOLERANCE: f32 = 0.6;

/// Upper bound on circles per hull side.
const MAX_HULL_SPAN: f32 = 64.0;

/// One circle of a hull approximation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    /// The single bounding circle of a small round body.
    pub fn of(body: &Body) -> Self {
        Self::new(body.pos(), body.size)
    }

    /// Signed gap between the two circle outlines; negative when overlapping.
    pub fn gap(&self, other: &Circle) -> f32 {
        (self.center - other.center).mag() - self.radius - other.radius
    }
}

/// Closest circle pair between two hulls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Approach {
    /// Index into the first hull.
    pub a: usize,
    /// Index into the second hull.
    pub b: usize,
    /// Signed distance; at or below zero the hulls intersect.
    pub distance: f32,
}

impl Approach {
    pub fn intersects(&self) -> bool {
        self.distance <= 0.0
    }

    /// Penetration depth, zero when apart.
    pub fn depth(&self) -> f32 {
        (-self.distance).max(0.0)
    }
}

/// Circles approximating an elongated silhouette centred at `center` and
/// pointing along `angle`.
///
/// `size` is the short radius and `lateral_cross_section` the ratio of long
/// to short axis. Circles run along the forward axis from `-max_offset` to
/// `+max_offset`, shrinking from `size` at the middle to `size / 2` at the
/// ends.
pub fn hull_circles(center: Vec2, angle: f32, size: f32, lateral_cross_section: f32) -> Vec<Circle> {
    if !(size > 0.0 && lateral_cross_section > 0.0 && size.is_finite() && lateral_cross_section.is_finite()) {
        return Vec::new();
    }

    let span = (lateral_cross_section * 1.6).floor().min(MAX_HULL_SPAN) as i32;
    if span == 0 {
        return vec![Circle::new(center, size)];
    }

    let max_offset = size * lateral_cross_section - size * 0.5;
    let forward = heading(angle);

    (-span..=span)
        .map(|i| {
            let t = i as f32 / span as f32;
            Circle::new(center + forward * (t * max_offset), lerp(size, size * 0.5, t.abs()))
        })
        .collect()
}

/// Hull circles of a body, oriented along its heading.
pub fn collision_circles(body: &Body, lateral_cross_section: f32) -> Vec<Circle> {
    hull_circles(body.pos(), body.angle(), body.size, lateral_cross_section)
}

/// Finds the circle pair with the smallest signed gap. `None` when either
/// hull is empty.
pub fn nearest_approach(a: &[Circle], b: &[Circle]) -> Option<Approach> {
    let mut best: Option<Approach> = None;

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            let distance = ca.gap(cb);
            if best.is_none_or(|best| distance < best.distance) {
                best = Some(Approach { a: i, b: j, distance });
            }
        }
    }

    best
}

/// Overlap depth between a hull and a single circle, or 0 when apart or on
/// different vertical layers.
pub fn touching_circle(hull: &[Circle], hull_altitude: f32, circle: Circle, circle_altitude: f32) -> f32 {
    if (hull_altitude - circle_altitude).abs() > LAYER_TOLERANCE {
        return 0.0;
    }

    nearest_approach(hull, std::slice::from_ref(&circle)).map_or(0.0, |approach| approach.depth())
}

/// Overlap depth between an elongated body and a small round one.
pub fn touching(hull_body: &Body, lateral_cross_section: f32, round: &Body) -> f32 {
    touching_circle(
        &collision_circles(hull_body, lateral_cross_section),
        hull_body.altitude,
        Circle::of(round),
        round.altitude,
    )
}
