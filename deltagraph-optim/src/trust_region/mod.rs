//! Constraints on where a line search may move the parameters.

pub mod distance;
pub mod orthant;

pub use distance::DistanceConstraint;
pub use orthant::SingleOrthant;

use std::fmt::Debug;

/// Maps a candidate parameter vector back into an allowed region around the
/// current one.
///
/// Both vectors are laid out the same way (flattened in parameter-id order).
/// Implementations must be idempotent: projecting an already projected
/// candidate returns it unchanged.
pub trait TrustRegion: Debug + Send + Sync {
    fn project(&self, current: &[f64], candidate: &[f64]) -> Vec<f64>;

    fn name(&self) -> &str;
}
