use crate::simulation::BodyHandle;

/// Errors raised by the physics core.
///
/// Physical degeneracies (zero-length vectors, empty hulls) are never errors;
/// only configuration that would poison later arithmetic is rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhysicsError {
    /// Weight must be finite and strictly positive, it divides every force.
    InvalidWeight(f32),
    /// Size must be finite and strictly positive.
    InvalidSize(f32),
    /// Radius force fields need a finite, strictly positive radius.
    InvalidRadius(f32),
    /// Time steps must be finite and non-negative.
    InvalidTimeStep(f32),
    /// The handle does not name a live body.
    StaleHandle(BodyHandle),
}

impl std::fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhysicsError::InvalidWeight(w) => write!(f, "Invalid body weight: {}", w),
            PhysicsError::InvalidSize(s) => write!(f, "Invalid body size: {}", s),
            PhysicsError::InvalidRadius(r) => write!(f, "Invalid field radius: {}", r),
            PhysicsError::InvalidTimeStep(dt) => write!(f, "Invalid time step: {}", dt),
            PhysicsError::StaleHandle(h) => write!(f, "Stale body handle: {:?}", h),
        }
    }
}

impl std::error::Error for PhysicsError {}

pub type Result<T> = std::result::Result<T, PhysicsError>;
