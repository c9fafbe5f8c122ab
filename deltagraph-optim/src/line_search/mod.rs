//! One-dimensional searches along a direction.
//!
//! A [`LineSearchStrategy`] probes a [`LineSearchCursor`](crate::cursor::LineSearchCursor)
//! at a sequence of rates and returns the point it settles on. Strategies
//! are stateful: the rate they finish with seeds the next search, which is
//! why the trainer keeps one instance per direction kind.

pub mod armijo_wolfe;
pub mod bisection;
pub mod static_rate;

pub use armijo_wolfe::{ArmijoWolfeConfig, ArmijoWolfeSearch};
pub use bisection::{BisectionConfig, BisectionSearch};
pub use static_rate::{StaticRateConfig, StaticRateSearch};

use crate::cursor::LineSearchCursor;
use crate::error::OptimError;
use crate::monitor::Monitor;
use deltagraph_core::PointSample;

pub trait LineSearchStrategy: Send {
    /// Searches along `cursor` and returns the chosen point.
    ///
    /// Failing to converge is not an error: the best point probed is
    /// returned instead, possibly the origin itself.
    fn step(
        &mut self,
        cursor: &mut dyn LineSearchCursor,
        monitor: &mut dyn Monitor,
    ) -> Result<PointSample, OptimError>;

    fn name(&self) -> &str;
}

/// Keeps the lowest of the points offered to it.
#[derive(Debug, Clone)]
pub(crate) struct BestPoint(PointSample);

impl BestPoint {
    pub(crate) fn new(origin: PointSample) -> Self {
        BestPoint(origin)
    }

    pub(crate) fn offer(&mut self, point: &PointSample) {
        if point.value() < self.0.value() {
            self.0 = point.clone();
        }
    }

    pub(crate) fn into_inner(self) -> PointSample {
        self.0
    }
}
