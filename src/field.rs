//! Radius force fields.
//!
//! A single weighted spatial effect shared by explosions, attractors and
//! repulsion discs: every qualifying body within the radius takes
//! distance-weighted damage and a radial push (or pull, for negative
//! knockback).

use crate::{
    body::Body,
    error::{PhysicsError, Result},
    hull::LAYER_TOLERANCE,
    simulation::{BodyHandle, Simulation},
};

use log::debug;
use ultraviolet::{Vec2, Vec3};

use std::fmt;
use std::sync::Arc;

/// Falloff weight at a distance from the field centre: 1 at the centre,
/// strictly decreasing, never infinite.
pub fn power(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0).sqrt())
}

/// One body affected by a field application.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldHit {
    pub handle: BodyHandle,
    pub distance: f32,
    pub power: f32,
    /// Damage routed to the body's owner.
    pub damage: f32,
    /// Planar force applied to the body.
    pub force: Vec2,
    /// Vertical force applied to the body, including the upward kick.
    pub vertical_force: f32,
}

/// Per-body knockback multiplier, on top of the weight exponent.
#[derive(Clone)]
pub struct KnockbackModifier(Arc<dyn Fn(BodyHandle, &Body) -> f32 + Send + Sync>);

impl KnockbackModifier {
    pub fn new(modifier: impl Fn(BodyHandle, &Body) -> f32 + Send + Sync + 'static) -> Self {
        Self(Arc::new(modifier))
    }

    pub fn factor(&self, handle: BodyHandle, body: &Body) -> f32 {
        (self.0)(handle, body)
    }
}

impl fmt::Debug for KnockbackModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KnockbackModifier")
    }
}

#[derive(Clone, Debug)]
pub struct RadiusField {
    pub center: Vec2,
    pub radius: f32,
    /// Damage at the centre.
    pub damage: f32,
    /// Force at the centre; negative values pull inward.
    pub knockback: f32,
    /// Altitude the effect happens at. Defaults to the water level.
    pub altitude: Option<f32>,
    /// Maximum altitude difference of affected bodies. `None` disables the
    /// vertical filter.
    pub altitude_band: Option<f32>,
    /// Knockback is multiplied by `weight^exponent` per body.
    pub weight_exponent: Option<f32>,
    pub knockback_modifier: Option<KnockbackModifier>,
    /// Bodies never affected, such as the instigator.
    pub excluded: Vec<BodyHandle>,
}

impl RadiusField {
    pub fn new(center: Vec2, radius: f32) -> Result<Self> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(PhysicsError::InvalidRadius(radius));
        }

        Ok(Self {
            center,
            radius,
            damage: 0.0,
            knockback: 0.0,
            altitude: None,
            altitude_band: None,
            weight_exponent: None,
            knockback_modifier: None,
            excluded: Vec::new(),
        })
    }

    /// Blast around a detonating shell. Heavier hulls are shoved harder,
    /// by `weight^0.5` and again by `weight^0.3`.
    pub fn explosion(center: Vec2, altitude: f32) -> Result<Self> {
        Ok(Self::new(center, 250.0)?
            .with_damage(8000.0)
            .with_knockback(100.0)
            .with_weight_exponent(0.5)
            .with_knockback_modifier(|_, body| body.weight.powf(0.3))
            .at_altitude(altitude))
    }

    /// Continuous black-hole style pull that also grinds down whatever it
    /// holds. Apply every tick with `Some(dt)`.
    pub fn attractor(center: Vec2, altitude: f32, radius: f32, strength: f32, damage_per_second: f32) -> Result<Self> {
        Ok(Self::new(center, radius)?
            .with_damage(damage_per_second)
            .with_knockback(-strength)
            .with_weight_exponent(0.5)
            .at_altitude(altitude))
    }

    /// Harmless shove away from the centre.
    pub fn repulsion(center: Vec2, altitude: f32) -> Result<Self> {
        Ok(Self::new(center, 600.0)?
            .with_knockback(2000.0)
            .with_weight_exponent(0.8)
            .at_altitude(altitude))
    }

    pub fn with_damage(mut self, damage: f32) -> Self {
        self.damage = damage;
        self
    }

    pub fn with_knockback(mut self, knockback: f32) -> Self {
        self.knockback = knockback;
        self
    }

    pub fn with_weight_exponent(mut self, exponent: f32) -> Self {
        self.weight_exponent = Some(exponent);
        self
    }

    pub fn with_knockback_modifier(
        mut self,
        modifier: impl Fn(BodyHandle, &Body) -> f32 + Send + Sync + 'static,
    ) -> Self {
        self.knockback_modifier = Some(KnockbackModifier::new(modifier));
        self
    }

    pub fn at_altitude(mut self, altitude: f32) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_altitude_band(mut self, band: f32) -> Self {
        self.altitude_band = Some(band);
        self
    }

    /// Only affects bodies on the effect's own vertical layer.
    pub fn same_layer(self) -> Self {
        self.with_altitude_band(LAYER_TOLERANCE)
    }

    pub fn excluding(mut self, handle: BodyHandle) -> Self {
        self.excluded.push(handle);
        self
    }

    fn in_band(&self, altitude: f32, body: &Body) -> bool {
        self.altitude_band
            .is_none_or(|band| (body.altitude - altitude).abs() <= band)
    }

    /// Applies the field to every qualifying body.
    ///
    /// `dt` marks a continuous effect: damage and forces are scaled by it.
    /// `None` applies a one-shot impulse. `filter` can veto bodies, and
    /// `on_damage` receives the damage owed to each body's owner, typically
    /// forwarding it to a [`Damageable`](crate::Damageable).
    ///
    /// Knockback follows the direction from the effect to the body in 3D, so
    /// bodies above or below the effect are also pushed vertically. Every
    /// body additionally gets an upward kick of `power·knockback·√weight/100`.
    pub fn apply(
        &self,
        sim: &mut Simulation,
        dt: Option<f32>,
        mut filter: impl FnMut(BodyHandle, &Body) -> bool,
        mut on_damage: impl FnMut(BodyHandle, f32),
    ) -> Vec<FieldHit> {
        let altitude = self.altitude.unwrap_or_else(|| sim.water_level());
        let mut hits = Vec::new();

        for (handle, distance) in sim.bodies_in_radius(self.center, self.radius) {
            if self.excluded.contains(&handle) {
                continue;
            }
            let Some(body) = sim.get_mut(handle) else {
                continue;
            };
            if !self.in_band(altitude, body) || !filter(handle, &*body) {
                continue;
            }

            let power = power(distance);
            let weighting = self.weight_exponent.map_or(1.0, |e| body.weight.powf(e));
            let modifier = self
                .knockback_modifier
                .as_ref()
                .map_or(1.0, |m| m.factor(handle, body));
            let knockback = power * self.knockback * modifier * weighting;

            let offset = body.pos() - self.center;
            let direction = normalize3_or_zero(Vec3::new(offset.x, offset.y, body.altitude - altitude));
            let force = Vec2::new(direction.x, direction.y) * knockback;
            let kick = power * self.knockback * body.weight.sqrt() / 100.0;
            let vertical_force = direction.z * knockback + kick;
            let damage = self.damage * power * dt.unwrap_or(1.0);

            body.apply_force(dt, force);
            body.apply_force_vertical(dt, vertical_force);
            if damage > 0.0 {
                on_damage(handle, damage);
            }

            hits.push(FieldHit {
                handle,
                distance,
                power,
                damage,
                force,
                vertical_force,
            });
        }

        debug!(
            "radius field at ({}, {}) r={} affected {} bodies",
            self.center.x,
            self.center.y,
            self.radius,
            hits.len()
        );

        hits
    }
}

fn normalize3_or_zero(v: Vec3) -> Vec3 {
    let mag = v.mag();
    if mag > f32::EPSILON && mag.is_finite() {
        v / mag
    } else {
        Vec3::zero()
    }
}
