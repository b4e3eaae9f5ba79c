use serde::{Deserialize, Serialize};

/// World-wide settings shared by every body in a [`Simulation`](crate::Simulation).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Global water surface altitude.
    pub water_level: f32,
    /// Caps buoyancy at twice the body's weight for every body, regardless of
    /// the per-body flag.
    pub cap_buoyancy: bool,
    /// Integrate bodies with rayon instead of sequentially.
    pub parallel: bool,
}

impl SimulationConfig {
    pub const DEFAULT_WATER_LEVEL: f32 = 0.1;
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            water_level: Self::DEFAULT_WATER_LEVEL,
            cap_buoyancy: false,
            parallel: false,
        }
    }
}
