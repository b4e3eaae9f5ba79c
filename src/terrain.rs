use ultraviolet::Vec2;

/// Height-field oracle consulted for floor, friction and slide computations.
///
/// The core never generates terrain; the host game supplies it.
pub trait Terrain: Send + Sync {
    /// Terrain altitude at a planar position.
    fn height_at(&self, x: f32, y: f32) -> f32;

    /// Height gradient at a planar position.
    ///
    /// Defaults to a central difference over one world unit.
    fn gradient_at(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(
            self.height_at(x + 0.5, y) - self.height_at(x - 0.5, y),
            self.height_at(x, y + 0.5) - self.height_at(x, y - 0.5),
        )
    }
}

/// Terrain with the same height everywhere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlatTerrain {
    pub height: f32,
}

impl FlatTerrain {
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

impl Default for FlatTerrain {
    /// Open sea: a seabed well below the default water level.
    fn default() -> Self {
        Self::new(-10.0)
    }
}

impl Terrain for FlatTerrain {
    fn height_at(&self, _x: f32, _y: f32) -> f32 {
        self.height
    }

    fn gradient_at(&self, _x: f32, _y: f32) -> Vec2 {
        Vec2::zero()
    }
}

/// Terrain backed by a height function.
pub struct FnTerrain<F> {
    height: F,
}

impl<F> FnTerrain<F>
where
    F: Fn(f32, f32) -> f32 + Send + Sync,
{
    pub fn new(height: F) -> Self {
        Self { height }
    }
}

impl<F> Terrain for FnTerrain<F>
where
    F: Fn(f32, f32) -> f32 + Send + Sync,
{
    fn height_at(&self, x: f32, y: f32) -> f32 {
        (self.height)(x, y)
    }
}
