//! Strategies that turn a measurement into a search direction.

pub mod gradient_descent;
pub mod lbfgs;
pub mod trust_region_strategy;

pub use gradient_descent::GradientDescent;
pub use lbfgs::Lbfgs;
pub use trust_region_strategy::TrustRegionStrategy;

use crate::cursor::{LineSearchCursor, SimpleLineSearchCursor};
use crate::error::OptimError;
use crate::monitor::Monitor;
use crate::trust_region::TrustRegion;
use deltagraph_core::{DeltaSet, PointSample, Trainable};
use std::sync::Arc;

/// Chooses where the next line search looks.
///
/// `kind` names the family of directions produced; the trainer keys its
/// line-search cache on it so that step-size warm starts are only shared
/// between comparable directions.
pub trait Orientation: Send {
    fn kind(&self) -> &str;

    /// A descent direction at `measurement`, keyed like its gradient.
    fn direction(
        &mut self,
        measurement: &PointSample,
        monitor: &mut dyn Monitor,
    ) -> Result<DeltaSet, OptimError>;

    /// Region every probe is projected into, if any.
    fn trust_region(&self) -> Option<Arc<dyn TrustRegion>> {
        None
    }

    /// Forgets any history. Called when the trainable switches batches.
    fn reset(&mut self) {}

    /// Builds a cursor walking the direction at `measurement`.
    fn orient<'a>(
        &mut self,
        subject: &'a mut dyn Trainable,
        measurement: PointSample,
        monitor: &mut dyn Monitor,
    ) -> Result<Box<dyn LineSearchCursor + 'a>, OptimError> {
        let direction = self.direction(&measurement, monitor)?;
        if !direction.is_finite() {
            return Err(OptimError::InvalidDirection {
                orientation: self.kind().to_string(),
                reason: "non-finite component".to_string(),
            });
        }
        let cursor = SimpleLineSearchCursor::new(subject, measurement, direction, self.kind());
        Ok(match self.trust_region() {
            Some(region) => Box::new(cursor.with_trust_region(region)),
            None => Box::new(cursor),
        })
    }
}
