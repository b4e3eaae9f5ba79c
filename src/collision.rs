use crate::{
    body::Body,
    damage::Damageable,
    hull::{collision_circles, nearest_approach, touching},
    simulation::{BodyHandle, Simulation},
    utils::normalize_or_zero,
};

use broccoli::aabb::Rect;
use log::debug;
use ultraviolet::Vec2;

/// Scales the contact impulse into a spin impulse.
pub const CONTACT_TORQUE_FACTOR: f32 = 0.1;
/// Relative kinetic energy to damage.
const HULL_DAMAGE_SCALE: f32 = 0.0001;
/// Floor on directionality so glancing blows still push and hurt.
const MIN_DIRECTIONALITY: f32 = 0.2;
const PROJECTILE_DAMAGE_SCALE: f32 = 0.5;
const MIN_DIRECTIONAL_BONUS: f32 = 0.6;
/// Keeps the head-on bonus finite for very fast shots.
const MAX_DIRECTIONAL_EXPONENT: f32 = 32.0;

/// Outcome of a resolved hull-vs-hull contact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HullContact {
    /// Midpoint of the closest circle pair.
    pub contact: Vec2,
    /// Unit vector from the second body's contact circle toward the first's.
    pub normal: Vec2,
    pub depth: f32,
    /// Closing momentum along the normal.
    pub energy: f32,
    pub directionality: f32,
    pub damage_a: f32,
    pub damage_b: f32,
}

impl HullContact {
    pub fn deliver(&self, a: &mut dyn Damageable, b: &mut dyn Damageable) {
        a.take_damage(self.damage_a, None);
        b.take_damage(self.damage_b, None);
    }
}

/// Outcome of a projectile striking a hull.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileHit {
    pub depth: f32,
    pub damage: f32,
    /// Momentum handed to the struck body.
    pub impulse: Vec2,
}

impl ProjectileHit {
    pub fn deliver(&self, target: &mut dyn Damageable) {
        target.take_damage(self.damage, None);
    }
}

/// Resolves contact between two elongated hulls.
///
/// Returns `None`, leaving both bodies untouched, unless their circle sets
/// overlap. Otherwise both bodies are pushed apart by the full penetration
/// depth and each receives spin and push impulses scaled by its own
/// restitution.
pub fn resolve_hull_collision(
    a: &mut Body,
    a_lateral_cross_section: f32,
    b: &mut Body,
    b_lateral_cross_section: f32,
) -> Option<HullContact> {
    let hull_a = collision_circles(a, a_lateral_cross_section);
    let hull_b = collision_circles(b, b_lateral_cross_section);

    let approach = nearest_approach(&hull_a, &hull_b)?;
    if !approach.intersects() {
        return None;
    }

    let (ca, cb) = (hull_a[approach.a], hull_b[approach.b]);
    let contact = (ca.center + cb.center) * 0.5;
    let mut normal = normalize_or_zero(ca.center - cb.center);
    if normal == Vec2::zero() {
        normal = normalize_or_zero(a.pos() - b.pos());
    }
    let depth = approach.depth();

    let relative_velocity = a.velocity() - b.velocity();
    let relative_momentum = a.momentum() - b.momentum();
    let energy = (-relative_momentum.dot(normal)).max(0.0);
    let directionality = normalize_or_zero(relative_velocity)
        .dot(-normal)
        .max(MIN_DIRECTIONALITY);

    let damage_a = a.kinetic_energy_relative_to(b) * directionality * HULL_DAMAGE_SCALE;
    let damage_b = b.kinetic_energy_relative_to(a) * directionality * HULL_DAMAGE_SCALE;

    // Each side moves by the whole depth; forces are recomputed next tick.
    let offset = normal * depth;
    a.shift(offset);
    b.shift(-offset);

    let spin = energy * CONTACT_TORQUE_FACTOR;
    a.apply_torque_at(None, contact, normal * (spin * a.restitution));
    b.apply_torque_at(None, contact, -normal * (spin * b.restitution));

    let push = normalize_or_zero(normalize_or_zero(a.pos() - b.pos()) + normal);
    a.apply_force(None, push * (energy * a.restitution));
    b.apply_force(None, -push * (energy * b.restitution));

    debug!(
        "hull contact at ({}, {}): depth {}, energy {}, damage {} / {}",
        contact.x, contact.y, depth, energy, damage_a, damage_b
    );

    Some(HullContact {
        contact,
        normal,
        depth,
        energy,
        directionality,
        damage_a,
        damage_b,
    })
}

/// Resolves a small round projectile against a hull.
///
/// On contact the projectile's momentum is handed to the hull and the
/// projectile is marked dying. Head-on hits earn an exponential damage bonus.
pub fn resolve_projectile_hit(
    projectile: &mut Body,
    target: &mut Body,
    target_lateral_cross_section: f32,
) -> Option<ProjectileHit> {
    let depth = touching(target, target_lateral_cross_section, projectile);
    if depth <= 0.0 {
        return None;
    }

    let toward = normalize_or_zero(target.pos() - projectile.pos());
    let closing = (projectile.velocity() - target.velocity()).dot(toward);
    let bonus = 1.5f32
        .powf(closing.min(MAX_DIRECTIONAL_EXPONENT))
        .max(MIN_DIRECTIONAL_BONUS);
    let damage = projectile.momentum_relative_to(target) * bonus * PROJECTILE_DAMAGE_SCALE;

    let impulse = projectile.momentum();
    target.apply_force(None, impulse);
    projectile.dying = true;

    debug!("projectile hit: depth {}, damage {}", depth, damage);

    Some(ProjectileHit {
        depth,
        damage,
        impulse,
    })
}

/// Candidate hull pairs whose bounding boxes overlap.
///
/// `lateral_cross_section` selects which bodies take part and their hull
/// elongation; bodies it maps to `None` are skipped.
pub fn find_hull_contacts(
    sim: &Simulation,
    lateral_cross_section: impl Fn(BodyHandle, &Body) -> Option<f32>,
) -> Vec<(BodyHandle, f32, BodyHandle, f32)> {
    let entries: Vec<(BodyHandle, f32)> = sim
        .iter()
        .filter_map(|(handle, body)| Some((handle, lateral_cross_section(handle, body)?)))
        .collect();

    let mut rects = entries
        .iter()
        .enumerate()
        .filter_map(|(index, &(handle, lcs))| {
            let body = sim.get(handle)?;
            let reach = body.size * lcs.max(1.0);
            let min = body.pos() - Vec2::one() * reach;
            let max = body.pos() + Vec2::one() * reach;
            Some((Rect::new(min.x, max.x, min.y, max.y), index))
        })
        .collect::<Vec<_>>();

    let mut pairs = Vec::new();
    let mut broccoli = broccoli::Tree::new(&mut rects);

    broccoli.find_colliding_pairs(|i, j| {
        let i = *i.unpack_inner();
        let j = *j.unpack_inner();
        pairs.push((i.min(j), i.max(j)));
    });

    // Tree traversal order is unspecified. `entries` follows insertion order,
    // which slot indices stop doing once slots are reused.
    pairs.sort_unstable();
    pairs
        .into_iter()
        .map(|(i, j)| {
            let (a, a_lcs) = entries[i];
            let (b, b_lcs) = entries[j];
            (a, a_lcs, b, b_lcs)
        })
        .collect()
}

/// Broad phase plus resolution for every overlapping hull pair.
pub fn resolve_hull_contacts(
    sim: &mut Simulation,
    lateral_cross_section: impl Fn(BodyHandle, &Body) -> Option<f32>,
) -> Vec<(BodyHandle, BodyHandle, HullContact)> {
    let candidates = find_hull_contacts(sim, lateral_cross_section);

    candidates
        .into_iter()
        .filter_map(|(a, a_lcs, b, b_lcs)| {
            let (body_a, body_b) = sim.pair_mut(a, b)?;
            let contact = resolve_hull_collision(body_a, a_lcs, body_b, b_lcs)?;
            Some((a, b, contact))
        })
        .collect()
}
