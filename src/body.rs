use crate::{
    config::SimulationConfig,
    error::{PhysicsError, Result},
    terrain::Terrain,
    utils::{self, cross, heading, lerp, normalize_or_zero},
};

use serde::{Deserialize, Serialize};
use ultraviolet::Vec2;

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

/// Density of water in kg/L.
pub const WATER_DENSITY: f32 = 0.997;

const AIR_DRAG_FACTOR: f32 = 0.3;
const WATER_DRAG_FACTOR: f32 = 6.5;
const SLIDE_FACTOR: f32 = 1000.0;
/// How far above its floor a body may hover and still count as resting.
const REST_TOLERANCE: f32 = 0.01;

/// Volume of a sphere of the given radius.
pub fn sphere_volume(radius: f32) -> f32 {
    radius * radius * radius * std::f32::consts::FRAC_PI_3 * 4.0
}

/// Shapes the velocity that linear drag opposes.
///
/// Selected by the owning game object when its body is created.
pub trait DragProfile: Send + Sync + fmt::Debug {
    /// Returns the velocity vector the drag coefficient multiplies.
    /// The default is isotropic.
    fn shape_velocity(&self, _angle: f32, velocity: Vec2) -> Vec2 {
        velocity
    }
}

/// Same drag in every direction.
#[derive(Clone, Copy, Debug, Default)]
pub struct Isotropic;

impl DragProfile for Isotropic {}

/// Elongated hull drag: motion across the heading is resisted
/// `lateral_cross_section` times harder than motion along it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShipDrag {
    pub lateral_cross_section: f32,
}

impl ShipDrag {
    pub fn new(lateral_cross_section: f32) -> Self {
        Self {
            lateral_cross_section,
        }
    }
}

impl DragProfile for ShipDrag {
    fn shape_velocity(&self, angle: f32, velocity: Vec2) -> Vec2 {
        let forward = heading(angle);
        let along = forward * velocity.dot(forward);
        let lateral = velocity - along;
        along + lateral * self.lateral_cross_section
    }
}

/// Creation parameters for a [`Body`]. Every field is optional when
/// deserialized; missing fields take the defaults below.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyParams {
    pub size: f32,
    pub angle: f32,
    pub velocity: Vec2,
    /// Starting altitude. Defaults to resting on the water or the terrain,
    /// whichever is higher.
    pub altitude: Option<f32>,
    pub vertical_speed: f32,
    pub weight: f32,
    pub base_drag: f32,
    pub base_friction: f32,
    pub angle_drag: f32,
    pub angular_velocity: f32,
    pub gravity: f32,
    pub buoyancy: f32,
    pub restitution: f32,
    pub frozen: bool,
    pub immovable: bool,
    pub cap_buoyancy: bool,
    #[serde(skip)]
    pub drag: Option<Arc<dyn DragProfile>>,
}

impl Default for BodyParams {
    fn default() -> Self {
        Self {
            size: 1.0,
            angle: 0.0,
            velocity: Vec2::zero(),
            altitude: None,
            vertical_speed: 0.0,
            weight: 1.0,
            base_drag: 0.5,
            base_friction: 0.007,
            angle_drag: 0.05,
            angular_velocity: 0.0,
            gravity: 9.7,
            buoyancy: 0.06,
            restitution: 0.5,
            frozen: false,
            immovable: false,
            cap_buoyancy: false,
            drag: None,
        }
    }
}

impl BodyParams {
    /// Rejects parameters that would poison later arithmetic.
    pub fn validate(&self) -> Result<()> {
        if !(self.weight.is_finite() && self.weight > 0.0) {
            return Err(PhysicsError::InvalidWeight(self.weight));
        }
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(PhysicsError::InvalidSize(self.size));
        }
        Ok(())
    }
}

/// Per-tick lazily computed values, dropped whenever `age` moves on.
#[derive(Clone, Copy, Debug)]
struct FrameCache {
    age: f32,
    floor: Option<f32>,
    volume: Option<f32>,
}

impl FrameCache {
    fn at(age: f32) -> Self {
        Self {
            age,
            floor: None,
            volume: None,
        }
    }
}

/// A physical point-body: planar Verlet motion plus a separate altitude axis.
///
/// Velocity is never stored; it is always `pos - last_pos`. Every writer of
/// `pos` moves `last_pos` by the same offset unless it means to change the
/// velocity.
#[derive(Clone, Debug)]
pub struct Body {
    pos: Vec2,
    last_pos: Vec2,
    angle: f32,
    angular_velocity: f32,
    age: f32,
    displacement: f32,

    /// Height relative to the global water level's frame.
    pub altitude: f32,
    pub vertical_speed: f32,
    /// Characteristic radius.
    pub size: f32,
    pub weight: f32,
    pub base_drag: f32,
    pub base_friction: f32,
    pub angular_drag: f32,
    pub gravity: f32,
    pub buoyancy: f32,
    pub restitution: f32,
    /// Skips integration; the body still ages.
    pub frozen: bool,
    /// Ignores forces, velocity writes and positional corrections.
    pub immovable: bool,
    pub cap_buoyancy: bool,
    /// Set by the owner; the simulation drops the body on its next tick.
    pub dying: bool,

    drag: Arc<dyn DragProfile>,
    cache: Cell<FrameCache>,
}

impl Body {
    /// Builds a body at `pos`, resolving defaults against the terrain and
    /// water level.
    pub fn new(
        pos: Vec2,
        params: BodyParams,
        terrain: &dyn Terrain,
        config: &SimulationConfig,
    ) -> Result<Self> {
        params.validate()?;

        let half = params.size * 0.5;
        let altitude = params
            .altitude
            .unwrap_or_else(|| config.water_level.max(terrain.height_at(pos.x, pos.y) + half));

        Ok(Self {
            pos,
            last_pos: pos - params.velocity,
            angle: utils::wrap_angle(params.angle),
            angular_velocity: params.angular_velocity,
            age: 0.0,
            displacement: 0.0,
            altitude,
            vertical_speed: params.vertical_speed,
            size: params.size,
            weight: params.weight,
            base_drag: params.base_drag,
            base_friction: params.base_friction,
            angular_drag: params.angle_drag,
            gravity: params.gravity,
            buoyancy: params.buoyancy,
            restitution: params.restitution,
            frozen: params.frozen,
            immovable: params.immovable,
            cap_buoyancy: params.cap_buoyancy || config.cap_buoyancy,
            dying: false,
            drag: params.drag.unwrap_or_else(|| Arc::new(Isotropic)),
            cache: Cell::new(FrameCache::at(0.0)),
        })
    }

    // -- motion state

    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    pub fn previous_pos(&self) -> Vec2 {
        self.last_pos
    }

    /// Implied velocity, `pos - previous_pos`.
    pub fn velocity(&self) -> Vec2 {
        self.pos - self.last_pos
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    /// Simulated seconds since creation.
    pub fn age(&self) -> f32 {
        self.age
    }

    /// Total planar distance travelled.
    pub fn displacement(&self) -> f32 {
        self.displacement
    }

    pub fn forward(&self) -> Vec2 {
        heading(self.angle)
    }

    pub fn drag_profile(&self) -> &dyn DragProfile {
        self.drag.as_ref()
    }

    // -- derived quantities

    pub fn vertical_half_extent(&self) -> f32 {
        self.size * 0.5
    }

    /// Rotational inertia, approximated by weight.
    pub fn angular_inertia(&self) -> f32 {
        self.weight
    }

    fn frame_cache(&self) -> FrameCache {
        let cache = self.cache.get();
        if cache.age == self.age {
            cache
        } else {
            FrameCache::at(self.age)
        }
    }

    /// Terrain height under this body, cached until the body ages.
    pub fn floor(&self, terrain: &dyn Terrain) -> f32 {
        let mut cache = self.frame_cache();
        let floor = match cache.floor {
            Some(floor) => floor,
            None => terrain.height_at(self.pos.x, self.pos.y),
        };
        cache.floor = Some(floor);
        self.cache.set(cache);
        floor
    }

    /// Sphere-equivalent volume, cached until the body ages.
    pub fn volume(&self) -> f32 {
        let mut cache = self.frame_cache();
        let volume = match cache.volume {
            Some(volume) => volume,
            None => sphere_volume(self.size),
        };
        cache.volume = Some(volume);
        self.cache.set(cache);
        volume
    }

    pub fn height_gradient(&self, terrain: &dyn Terrain) -> Vec2 {
        terrain.gradient_at(self.pos.x, self.pos.y)
    }

    /// Fraction of the vertical extent below the water surface, in `[0, 1]`.
    /// Always 0 over dry land.
    pub fn submersion(&self, terrain: &dyn Terrain, water_level: f32) -> f32 {
        if self.floor(terrain) > water_level {
            return 0.0;
        }
        let half = self.vertical_half_extent();
        let bottom = self.altitude - half;
        ((water_level - bottom) / (2.0 * half)).clamp(0.0, 1.0)
    }

    pub fn is_in_water(&self, terrain: &dyn Terrain, water_level: f32) -> bool {
        self.floor(terrain) <= water_level
            && self.altitude - self.vertical_half_extent() <= water_level
    }

    /// Resting on dry terrain rather than floating or flying.
    pub fn is_grounded(&self, terrain: &dyn Terrain, water_level: f32) -> bool {
        let floor = self.floor(terrain);
        floor > water_level && self.altitude - self.vertical_half_extent() <= floor + REST_TOLERANCE
    }

    /// Weight of the displaced water, using a spherical-cap volume.
    pub fn buoyant_force(&self, submersion: f32) -> f32 {
        let cap = std::f32::consts::PI * submersion * submersion * (3.0 - submersion) / 3.0;
        cap * self.volume() * WATER_DENSITY * self.gravity
    }

    /// Linear drag coefficient, blended between air and water.
    pub fn drag_coefficient(&self, submersion: f32) -> f32 {
        let air = self.size * self.base_drag * AIR_DRAG_FACTOR;
        let water = self.size * self.base_drag * WATER_DRAG_FACTOR;
        lerp(air, water, submersion)
    }

    pub fn momentum(&self) -> Vec2 {
        self.velocity() * self.weight
    }

    /// Magnitude of this body's momentum in `other`'s frame.
    pub fn momentum_relative_to(&self, other: &Body) -> f32 {
        (self.velocity() - other.velocity()).mag() * self.weight
    }

    /// `½·weight·|v - v_other|²`, using this body's weight.
    pub fn kinetic_energy_relative_to(&self, other: &Body) -> f32 {
        0.5 * self.weight * (self.velocity() - other.velocity()).mag_sq()
    }

    /// Coarse bounding-circle overlap test.
    pub fn circle_intersect(&self, other: &Body, scale: f32) -> bool {
        let reach = (self.size + other.size) * scale;
        (self.pos - other.pos).mag_sq() <= reach * reach
    }

    // -- writers

    /// Changes the implied velocity by `force·dt/weight`. `None` applies
    /// the force as an instantaneous impulse.
    pub fn apply_force(&mut self, dt: Option<f32>, force: Vec2) {
        if self.immovable {
            return;
        }
        let factor = dt.unwrap_or(1.0) / self.weight;
        self.last_pos -= force * factor;
    }

    pub fn apply_force_vertical(&mut self, dt: Option<f32>, force: f32) {
        if self.immovable {
            return;
        }
        self.vertical_speed += force * dt.unwrap_or(1.0) / self.weight;
    }

    pub fn apply_torque(&mut self, dt: Option<f32>, torque: f32) {
        if self.immovable {
            return;
        }
        self.angular_velocity += torque * dt.unwrap_or(1.0) / self.angular_inertia();
    }

    /// Torque from a force applied at a world-space point.
    pub fn apply_torque_at(&mut self, dt: Option<f32>, point: Vec2, force: Vec2) {
        let lever = point - self.pos;
        self.apply_torque(dt, cross(lever, force));
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        if self.immovable {
            return;
        }
        self.last_pos = self.pos - velocity;
    }

    /// Moves the body without changing its velocity.
    pub fn shift(&mut self, offset: Vec2) {
        if self.immovable {
            return;
        }
        self.pos += offset;
        self.last_pos += offset;
        self.cache.set(FrameCache::at(self.age));
    }

    /// Places the body somewhere else, keeping its velocity.
    pub fn teleport(&mut self, pos: Vec2) {
        let velocity = self.velocity();
        self.pos = pos;
        self.last_pos = pos - velocity;
        self.cache.set(FrameCache::at(self.age));
    }

    /// Applies a force that opposes motion, zeroing the velocity instead of
    /// letting it flip direction within the tick.
    fn apply_opposing(&mut self, dt: f32, force: Vec2) {
        let velocity = self.velocity();
        let after = velocity + force * (dt / self.weight);
        if after.dot(velocity) <= 0.0 {
            self.set_velocity(Vec2::zero());
        } else {
            self.apply_force(Some(dt), force);
        }
    }

    // -- integration

    /// Advances the body by `dt` seconds.
    pub fn tick(&mut self, dt: f32, terrain: &dyn Terrain, water_level: f32) {
        self.age += dt;
        if self.frozen {
            return;
        }

        self.phys_angle(dt);
        self.phys_gravity(dt, terrain, water_level);
        self.phys_vel(dt);
        self.phys_drag(dt, terrain, water_level);
        self.phys_friction(dt, terrain, water_level);
        self.slide_down_land(dt, terrain, water_level);
    }

    fn phys_angle(&mut self, dt: f32) {
        self.angle += self.angular_velocity * dt;
        self.angular_velocity -= self.angular_velocity * self.angular_drag * dt;
        self.angle = utils::wrap_angle(self.angle);
    }

    fn phys_gravity(&mut self, dt: f32, terrain: &dyn Terrain, water_level: f32) {
        self.altitude += self.vertical_speed * dt;

        let floor = self.floor(terrain);
        let half = self.vertical_half_extent();

        if self.altitude - half < floor {
            self.altitude = floor + half;
            self.vertical_speed = 0.0;
            return;
        }

        let submersion = self.submersion(terrain, water_level);
        if submersion > 0.0 {
            if !self.immovable {
                let damping = self.vertical_speed * self.drag_coefficient(submersion) * dt / self.weight;
                if damping.abs() >= self.vertical_speed.abs() {
                    self.vertical_speed = 0.0;
                } else {
                    self.vertical_speed -= damping;
                }
            }

            let mut lift = self.buoyancy * self.buoyant_force(submersion);
            if self.cap_buoyancy {
                lift = lift.min(2.0 * self.weight * self.gravity);
            }
            self.apply_force_vertical(Some(dt), lift);
        }

        self.apply_force_vertical(Some(dt), -self.gravity * self.weight);
    }

    /// Explicit Verlet step: both ends of the velocity move by `velocity·dt`.
    fn phys_vel(&mut self, dt: f32) {
        let offset = (self.pos - self.last_pos) * dt;
        self.pos += offset;
        self.last_pos += offset;
        self.displacement += offset.mag();
    }

    fn phys_drag(&mut self, dt: f32, terrain: &dyn Terrain, water_level: f32) {
        let velocity = self.velocity();
        if velocity == Vec2::zero() {
            return;
        }

        let submersion = self.submersion(terrain, water_level);
        let coefficient = self.drag_coefficient(submersion);
        let shaped = self.drag.shape_velocity(self.angle, velocity);

        self.apply_opposing(dt, shaped * -coefficient);
    }

    fn phys_friction(&mut self, dt: f32, terrain: &dyn Terrain, water_level: f32) {
        if !self.is_grounded(terrain, water_level) {
            return;
        }

        let direction = normalize_or_zero(self.velocity());
        if direction == Vec2::zero() {
            return;
        }

        let steepness = 1.0 / (1.0 + self.height_gradient(terrain).mag());
        let friction = self.base_friction * self.weight * self.weight * steepness;

        self.apply_opposing(dt, direction * -friction);
    }

    fn slide_down_land(&mut self, dt: f32, terrain: &dyn Terrain, water_level: f32) {
        if !self.is_grounded(terrain, water_level) {
            return;
        }

        // Steepness only picks the direction; the pull is the same on any slope.
        let downhill = -normalize_or_zero(self.height_gradient(terrain));
        let force = downhill * (self.gravity * self.weight * SLIDE_FACTOR);
        self.apply_force(Some(dt), force);
    }
}
