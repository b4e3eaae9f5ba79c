/// A game object capable of taking damage.
///
/// Bodies carry no damage state; collision and radius-field passes report
/// damage amounts which the owning game object receives through this trait.
pub trait Damageable {
    /// Take damage.
    ///
    /// `dt` marks the damage as continuous (applied every tick). It must NOT
    /// scale the amount; callers have already done that.
    fn take_damage(&mut self, amount: f32, dt: Option<f32>);

    /// Damage accumulated so far.
    fn damage(&self) -> f32;

    /// Damage this object can receive before being destroyed, if bounded.
    fn max_damage(&self) -> Option<f32>;
}

/// Fraction of maximum damage already taken, or 0 for unbounded objects.
pub fn damage_out_of_max(target: &dyn Damageable) -> f32 {
    match target.max_damage() {
        Some(max) if max > 0.0 => target.damage() / max,
        _ => 0.0,
    }
}
