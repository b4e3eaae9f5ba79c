use crate::{
    body::{BodyParams, DragProfile, ShipDrag},
    config::SimulationConfig,
    field::RadiusField,
    simulation::{BodyHandle, Simulation},
    terrain::{FlatTerrain, FnTerrain},
};
use std::sync::Arc;
use ultraviolet::Vec2;

/// Returned by `Simulation_AddBody` when the body is rejected.
pub const INVALID_BODY: u64 = u64::MAX;

/// Host-supplied terrain height at `(x, y)`.
pub type HeightCallback = extern "C" fn(f32, f32) -> f32;

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Simulation_Create(water_level: f32, seabed: f32) -> *mut Simulation {
    let config = SimulationConfig {
        water_level,
        ..SimulationConfig::default()
    };
    Box::into_raw(Box::new(Simulation::with_terrain(Arc::new(FlatTerrain::new(seabed)), config)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Simulation_CreateWithTerrain(water_level: f32, height: HeightCallback) -> *mut Simulation {
    let config = SimulationConfig {
        water_level,
        ..SimulationConfig::default()
    };
    let terrain = FnTerrain::new(move |x, y| height(x, y));
    Box::into_raw(Box::new(Simulation::with_terrain(Arc::new(terrain), config)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Simulation_Destroy(handle: *mut Simulation) {
    if !handle.is_null() {
        unsafe { drop(Box::from_raw(handle)) };
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Simulation_SetParallel(handle: *mut Simulation, parallel: bool) {
    if let Some(sim) = unsafe { handle.as_mut() } {
        sim.config.parallel = parallel;
    }
}

/// Returns false when the handle is null or `dt` is rejected.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Simulation_Tick(handle: *mut Simulation, dt: f32) -> bool {
    unsafe { handle.as_mut() }.is_some_and(|sim| sim.tick(dt).is_ok())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Simulation_GetBodyCount(handle: *const Simulation) -> usize {
    unsafe { handle.as_ref() }.map_or(0, |sim| sim.len())
}

/// Adds a body with default drag and friction. A positive
/// `lateral_cross_section` gives it ship-like anisotropic drag.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Simulation_AddBody(
    handle: *mut Simulation,
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    angle: f32,
    weight: f32,
    size: f32,
    lateral_cross_section: f32,
) -> u64 {
    let Some(sim) = (unsafe { handle.as_mut() }) else {
        return INVALID_BODY;
    };

    let params = BodyParams {
        size,
        weight,
        angle,
        velocity: Vec2::new(vx, vy),
        drag: (lateral_cross_section > 0.0)
            .then(|| Arc::new(ShipDrag::new(lateral_cross_section)) as Arc<dyn DragProfile>),
        ..BodyParams::default()
    };

    sim.create_body(Vec2::new(x, y), params)
        .map_or(INVALID_BODY, BodyHandle::to_bits)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Simulation_MarkDying(handle: *mut Simulation, body: u64) -> bool {
    unsafe { handle.as_mut() }.is_some_and(|sim| sim.mark_dying(BodyHandle::from_bits(body)).is_ok())
}

/// Writes the body position into `out_x`/`out_y`. Returns false for stale
/// handles, leaving the outputs untouched.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Simulation_GetPosition(
    handle: *const Simulation,
    body: u64,
    out_x: *mut f32,
    out_y: *mut f32,
) -> bool {
    let Some(pos) = (unsafe { handle.as_ref() })
        .and_then(|sim| sim.get(BodyHandle::from_bits(body)))
        .map(|body| body.pos())
    else {
        return false;
    };
    unsafe { write_vec(pos, out_x, out_y) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Simulation_GetVelocity(
    handle: *const Simulation,
    body: u64,
    out_x: *mut f32,
    out_y: *mut f32,
) -> bool {
    let Some(vel) = (unsafe { handle.as_ref() })
        .and_then(|sim| sim.get(BodyHandle::from_bits(body)))
        .map(|body| body.velocity())
    else {
        return false;
    };
    unsafe { write_vec(vel, out_x, out_y) }
}

/// Altitude of the body, NaN for stale handles.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Simulation_GetAltitude(handle: *const Simulation, body: u64) -> f32 {
    unsafe { handle.as_ref() }
        .and_then(|sim| sim.get(BodyHandle::from_bits(body)))
        .map_or(f32::NAN, |body| body.altitude)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Simulation_SetVelocity(handle: *mut Simulation, body: u64, vx: f32, vy: f32) {
    if let Some(body) = unsafe { handle.as_mut() }.and_then(|sim| sim.get_mut(BodyHandle::from_bits(body))) {
        body.set_velocity(Vec2::new(vx, vy));
    }
}

/// Applies an impulse when `dt` is not positive, a continuous force
/// otherwise.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Simulation_ApplyForce(handle: *mut Simulation, body: u64, fx: f32, fy: f32, dt: f32) {
    if let Some(body) = unsafe { handle.as_mut() }.and_then(|sim| sim.get_mut(BodyHandle::from_bits(body))) {
        body.apply_force((dt > 0.0).then_some(dt), Vec2::new(fx, fy));
    }
}

/// Pushes every body within `radius` of `(x, y)` away from it, pulling for
/// negative `knockback`. Returns the number of bodies affected.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Simulation_ApplyRadiusForce(
    handle: *mut Simulation,
    x: f32,
    y: f32,
    radius: f32,
    knockback: f32,
    dt: f32,
) -> usize {
    let Some(sim) = (unsafe { handle.as_mut() }) else {
        return 0;
    };
    let Ok(field) = RadiusField::new(Vec2::new(x, y), radius) else {
        return 0;
    };

    field
        .with_knockback(knockback)
        .apply(sim, (dt > 0.0).then_some(dt), |_, _| true, |_, _| {})
        .len()
}

unsafe fn write_vec(v: Vec2, out_x: *mut f32, out_y: *mut f32) -> bool {
    if out_x.is_null() || out_y.is_null() {
        return false;
    }
    unsafe {
        *out_x = v.x;
        *out_y = v.y;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn ramp(x: f32, _y: f32) -> f32 {
        x * 0.1 - 5.0
    }

    #[test]
    fn host_round_trip() {
        unsafe {
            let sim = Simulation_Create(0.1, -10.0);
            let ship = Simulation_AddBody(sim, 0.0, 0.0, 2.0, 0.0, 0.0, 400.0, 14.0, 2.0);
            let shot = Simulation_AddBody(sim, 5.0, 5.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0);
            assert_ne!(ship, INVALID_BODY);
            assert_eq!(Simulation_AddBody(sim, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0, 1.0, 0.0), INVALID_BODY);
            assert_eq!(Simulation_GetBodyCount(sim), 2);

            assert!(Simulation_Tick(sim, 1.0 / 60.0));
            assert!(!Simulation_Tick(sim, f32::NAN));

            let (mut x, mut y) = (0.0f32, 0.0f32);
            assert!(Simulation_GetPosition(sim, ship, &mut x, &mut y));
            assert!(x > 0.0);

            Simulation_SetVelocity(sim, shot, 0.0, 3.0);
            let (mut vx, mut vy) = (0.0f32, 0.0f32);
            assert!(Simulation_GetVelocity(sim, shot, &mut vx, &mut vy));
            assert!((vy - 3.0).abs() < 1e-5);

            assert_eq!(Simulation_ApplyRadiusForce(sim, 5.0, 0.0, 10.0, 50.0, 0.0), 2);
            assert_eq!(Simulation_ApplyRadiusForce(sim, 5.0, 0.0, -1.0, 50.0, 0.0), 0);

            assert!(Simulation_MarkDying(sim, shot));
            Simulation_Tick(sim, 1.0 / 60.0);
            assert_eq!(Simulation_GetBodyCount(sim), 1);
            assert!(Simulation_GetAltitude(sim, shot).is_nan());
            assert!(!Simulation_GetPosition(sim, shot, &mut x, &mut y));

            Simulation_Destroy(sim);
        }
    }

    #[test]
    fn callback_terrain_and_null_handles() {
        unsafe {
            let sim = Simulation_CreateWithTerrain(0.1, ramp);
            let body = Simulation_AddBody(sim, 100.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0);
            // Ground at 5 plus half the body size.
            assert!((Simulation_GetAltitude(sim, body) - 5.5).abs() < 1e-4);
            Simulation_Destroy(sim);

            let null: *mut Simulation = std::ptr::null_mut();
            assert_eq!(Simulation_GetBodyCount(null), 0);
            assert!(!Simulation_Tick(null, 0.1));
            assert_eq!(Simulation_AddBody(null, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0), INVALID_BODY);
            Simulation_Destroy(null);
        }
    }
}
