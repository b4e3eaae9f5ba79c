pub mod body;
pub mod c_api;
pub mod collision;
pub mod config;
pub mod damage;
pub mod error;
pub mod field;
pub mod hull;
pub mod simulation;
pub mod terrain;
pub mod utils;

pub use body::{Body, BodyParams, DragProfile, Isotropic, ShipDrag};
pub use collision::{HullContact, ProjectileHit, resolve_hull_collision, resolve_hull_contacts, resolve_projectile_hit};
pub use config::SimulationConfig;
pub use damage::{Damageable, damage_out_of_max};
pub use error::{PhysicsError, Result};
pub use field::{FieldHit, KnockbackModifier, RadiusField};
pub use hull::{Circle, collision_circles, nearest_approach, touching};
pub use simulation::{BodyHandle, Simulation};
pub use terrain::{FlatTerrain, FnTerrain, Terrain};
pub use ultraviolet::Vec2;
