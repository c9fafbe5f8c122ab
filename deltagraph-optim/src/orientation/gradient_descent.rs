use super::Orientation;
use crate::error::OptimError;
use crate::monitor::Monitor;
use deltagraph_core::{DeltaSet, PointSample};

/// Steepest descent: the direction is the negated gradient.
#[derive(Debug, Clone, Copy, Default)]
pub struct GradientDescent;

impl GradientDescent {
    pub fn new() -> Self {
        GradientDescent
    }
}

impl Orientation for GradientDescent {
    fn kind(&self) -> &str {
        "GradientDescent"
    }

    fn direction(
        &mut self,
        measurement: &PointSample,
        _monitor: &mut dyn Monitor,
    ) -> Result<DeltaSet, OptimError> {
        Ok(measurement.delta().scale(-1.0))
    }
}
