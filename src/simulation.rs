use crate::{
    body::{Body, BodyParams},
    config::SimulationConfig,
    error::{PhysicsError, Result},
    terrain::{FlatTerrain, Terrain},
};

use log::{debug, trace, warn};
use rayon::prelude::*;
use ultraviolet::Vec2;

use std::sync::Arc;

/// Stable reference to a body inside a [`Simulation`].
///
/// Handles stay valid until their body is removed; a slot reused by a later
/// body gets a new generation, so stale handles never alias it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    /// Packs the handle into a single integer for FFI.
    pub fn to_bits(self) -> u64 {
        (self.generation as u64) << 32 | self.index as u64
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    body: Option<Body>,
}

/// Owns every live body and steps them frame by frame.
pub struct Simulation {
    pub config: SimulationConfig,
    /// Number of completed ticks.
    pub frame: usize,
    /// Total simulated time.
    pub elapsed: f32,
    terrain: Arc<dyn Terrain>,
    slots: Vec<Slot>,
    /// Live slot indices in insertion order.
    order: Vec<u32>,
    free: Vec<u32>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("frame", &self.frame)
            .field("elapsed", &self.elapsed)
            .field("terrain", &"Terrain")
            .field("bodies", &self.order.len())
            .finish()
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    /// Open sea with the default water level.
    pub fn new() -> Self {
        Self::with_terrain(Arc::new(FlatTerrain::default()), SimulationConfig::default())
    }

    pub fn with_terrain(terrain: Arc<dyn Terrain>, config: SimulationConfig) -> Self {
        Self {
            config,
            frame: 0,
            elapsed: 0.0,
            terrain,
            slots: Vec::new(),
            order: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn terrain(&self) -> &dyn Terrain {
        self.terrain.as_ref()
    }

    pub fn water_level(&self) -> f32 {
        self.config.water_level
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Creates a body on behalf of a game object.
    pub fn create_body(&mut self, pos: Vec2, params: BodyParams) -> Result<BodyHandle> {
        let body = Body::new(pos, params, self.terrain.as_ref(), &self.config).inspect_err(|err| {
            warn!("rejected body at ({}, {}): {}", pos.x, pos.y, err);
        })?;
        let handle = self.insert(body);
        debug!("created body {:?} at ({}, {})", handle, pos.x, pos.y);
        Ok(handle)
    }

    /// Adds an already built body.
    pub fn insert(&mut self, body: Body) -> BodyHandle {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].body = Some(body);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    body: Some(body),
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.order.push(index);

        BodyHandle {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    /// Removes a body immediately, returning it.
    pub fn remove(&mut self, handle: BodyHandle) -> Option<Body> {
        self.get(handle)?;
        self.order.retain(|&index| index != handle.index);
        let body = self.release(handle.index);
        debug!("removed body {:?}", handle);
        body
    }

    /// Flags a body for removal at the start of the next tick.
    pub fn mark_dying(&mut self, handle: BodyHandle) -> Result<()> {
        let body = self.get_mut(handle).ok_or(PhysicsError::StaleHandle(handle))?;
        body.dying = true;
        Ok(())
    }

    fn release(&mut self, index: u32) -> Option<Body> {
        let slot = &mut self.slots[index as usize];
        let body = slot.body.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        body
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&Body> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_ref())
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_mut())
    }

    /// Mutable access to two distinct bodies at once.
    pub fn pair_mut(&mut self, a: BodyHandle, b: BodyHandle) -> Option<(&mut Body, &mut Body)> {
        if a.index == b.index || !self.contains(a) || !self.contains(b) {
            return None;
        }

        let (lo, hi) = (a.index.min(b.index) as usize, a.index.max(b.index) as usize);
        let (head, tail) = self.slots.split_at_mut(hi);
        let low = head[lo].body.as_mut()?;
        let high = tail[0].body.as_mut()?;

        if a.index < b.index {
            Some((low, high))
        } else {
            Some((high, low))
        }
    }

    /// Live bodies in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &Body)> + '_ {
        self.order.iter().filter_map(move |&index| {
            let slot = &self.slots[index as usize];
            slot.body.as_ref().map(|body| {
                (
                    BodyHandle {
                        index,
                        generation: slot.generation,
                    },
                    body,
                )
            })
        })
    }

    pub fn handles(&self) -> Vec<BodyHandle> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    /// Bodies whose planar distance to `center` is at most `radius`, with
    /// that distance.
    pub fn bodies_in_radius(&self, center: Vec2, radius: f32) -> Vec<(BodyHandle, f32)> {
        let r_sq = radius * radius;
        self.iter()
            .filter_map(|(handle, body)| {
                let d_sq = (body.pos() - center).mag_sq();
                (d_sq <= r_sq).then(|| (handle, d_sq.sqrt()))
            })
            .collect()
    }

    /// Advances the simulation by `dt` seconds.
    /// Dying bodies are dropped first, then every remaining body integrates.
    pub fn tick(&mut self, dt: f32) -> Result<()> {
        if !(dt.is_finite() && dt >= 0.0) {
            return Err(PhysicsError::InvalidTimeStep(dt));
        }

        self.prune();
        self.iterate(dt);

        self.frame += 1;
        self.elapsed += dt;
        Ok(())
    }

    /// Compacts away bodies their owners marked as dying.
    fn prune(&mut self) {
        let dying: Vec<u32> = self
            .order
            .iter()
            .copied()
            .filter(|&index| {
                self.slots[index as usize]
                    .body
                    .as_ref()
                    .is_some_and(|body| body.dying)
            })
            .collect();

        if dying.is_empty() {
            return;
        }

        for &index in &dying {
            self.release(index);
        }
        self.order.retain(|&index| self.slots[index as usize].body.is_some());
        trace!("pruned {} dying bodies on frame {}", dying.len(), self.frame);
    }

    /// Integrates every body. Bodies only read the shared terrain, so the
    /// parallel path yields the same state as the sequential one.
    fn iterate(&mut self, dt: f32) {
        let terrain = self.terrain.as_ref();
        let water_level = self.config.water_level;

        if self.config.parallel {
            self.slots.par_iter_mut().for_each(|slot| {
                if let Some(body) = slot.body.as_mut() {
                    body.tick(dt, terrain, water_level);
                }
            });
        } else {
            for &index in &self.order {
                if let Some(body) = self.slots[index as usize].body.as_mut() {
                    body.tick(dt, terrain, water_level);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim() -> Simulation {
        let _ = env_logger::builder().is_test(true).try_init();
        Simulation::new()
    }

    #[test]
    fn create_and_lookup() {
        let mut sim = sim();
        let a = sim.create_body(Vec2::new(1.0, 2.0), BodyParams::default()).unwrap();
        let b = sim.create_body(Vec2::new(3.0, 4.0), BodyParams::default()).unwrap();

        assert_eq!(sim.len(), 2);
        assert_eq!(sim.get(a).unwrap().pos(), Vec2::new(1.0, 2.0));
        assert_eq!(sim.get(b).unwrap().pos(), Vec2::new(3.0, 4.0));
        assert_eq!(sim.handles(), vec![a, b]);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let mut sim = sim();
        let params = BodyParams {
            weight: -1.0,
            ..BodyParams::default()
        };
        assert_eq!(
            sim.create_body(Vec2::zero(), params).unwrap_err(),
            PhysicsError::InvalidWeight(-1.0)
        );
        assert!(sim.is_empty());
    }

    #[test]
    fn dying_bodies_are_pruned_on_next_tick() {
        let mut sim = sim();
        let a = sim.create_body(Vec2::zero(), BodyParams::default()).unwrap();
        let b = sim.create_body(Vec2::new(5.0, 0.0), BodyParams::default()).unwrap();

        sim.mark_dying(a).unwrap();
        assert!(sim.contains(a));

        sim.tick(1.0 / 60.0).unwrap();
        assert!(!sim.contains(a));
        assert!(sim.contains(b));
        assert_eq!(sim.len(), 1);
        assert_eq!(sim.mark_dying(a), Err(PhysicsError::StaleHandle(a)));
    }

    #[test]
    fn reused_slots_do_not_alias_stale_handles() {
        let mut sim = sim();
        let a = sim.create_body(Vec2::zero(), BodyParams::default()).unwrap();
        assert!(sim.remove(a).is_some());

        let b = sim.create_body(Vec2::new(9.0, 9.0), BodyParams::default()).unwrap();
        assert_ne!(a, b);
        assert!(sim.get(a).is_none());
        assert!(sim.remove(a).is_none());
        assert_eq!(sim.get(b).unwrap().pos(), Vec2::new(9.0, 9.0));
        assert_eq!(BodyHandle::from_bits(b.to_bits()), b);
    }

    #[test]
    fn pair_mut_returns_requested_order() {
        let mut sim = sim();
        let a = sim.create_body(Vec2::new(1.0, 0.0), BodyParams::default()).unwrap();
        let b = sim.create_body(Vec2::new(2.0, 0.0), BodyParams::default()).unwrap();

        let (bb, aa) = sim.pair_mut(b, a).unwrap();
        assert_eq!(bb.pos().x, 2.0);
        assert_eq!(aa.pos().x, 1.0);
        assert!(sim.pair_mut(a, a).is_none());
    }

    #[test]
    fn radius_query_is_inclusive() {
        let mut sim = sim();
        let edge = sim.create_body(Vec2::new(10.0, 0.0), BodyParams::default()).unwrap();
        let _outside = sim.create_body(Vec2::new(10.5, 0.0), BodyParams::default()).unwrap();

        let found = sim.bodies_in_radius(Vec2::zero(), 10.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, edge);
        assert!((found[0].1 - 10.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_bad_time_step() {
        let mut sim = sim();
        assert!(sim.tick(f32::NAN).is_err());
        assert!(sim.tick(-1.0).is_err());
        assert_eq!(sim.frame, 0);
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut seq = sim();
        let mut par = Simulation::with_terrain(
            Arc::new(FlatTerrain::default()),
            SimulationConfig {
                parallel: true,
                ..SimulationConfig::default()
            },
        );

        for (pos, params) in crate::utils::scatter_fleet(64, 200.0) {
            seq.create_body(pos, params.clone()).unwrap();
            par.create_body(pos, params).unwrap();
        }

        for _ in 0..30 {
            seq.tick(1.0 / 60.0).unwrap();
            par.tick(1.0 / 60.0).unwrap();
        }

        for ((_, a), (_, b)) in seq.iter().zip(par.iter()) {
            assert!((a.pos() - b.pos()).mag() < 1e-4);
            assert!((a.altitude - b.altitude).abs() < 1e-4);
        }
    }
}
