use super::Orientation;
use crate::error::OptimError;
use crate::monitor::Monitor;
use crate::trust_region::TrustRegion;
use deltagraph_core::{DeltaSet, PointSample};
use std::sync::Arc;

/// Wraps another orientation and projects every probe through a trust region.
pub struct TrustRegionStrategy {
    inner: Box<dyn Orientation>,
    region: Arc<dyn TrustRegion>,
    kind: String,
}

impl TrustRegionStrategy {
    pub fn new(inner: Box<dyn Orientation>, region: Arc<dyn TrustRegion>) -> Self {
        let kind = format!("TrustRegion[{}]({})", region.name(), inner.kind());
        TrustRegionStrategy { inner, region, kind }
    }

    pub fn region(&self) -> &Arc<dyn TrustRegion> {
        &self.region
    }
}

impl Orientation for TrustRegionStrategy {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn direction(
        &mut self,
        measurement: &PointSample,
        monitor: &mut dyn Monitor,
    ) -> Result<DeltaSet, OptimError> {
        self.inner.direction(measurement, monitor)
    }

    fn trust_region(&self) -> Option<Arc<dyn TrustRegion>> {
        Some(self.region.clone())
    }

    fn reset(&mut self) {
        self.inner.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::LineSearchCursor;
    use crate::monitor::RecordingMonitor;
    use crate::orientation::GradientDescent;
    use crate::test_support::scalar_regression;
    use crate::trust_region::DistanceConstraint;
    use approx::assert_abs_diff_eq;
    use deltagraph_core::Trainable;

    #[test]
    fn test_probes_are_projected() -> Result<(), OptimError> {
        let (weight, mut subject) = scalar_regression(0.0, 2.0, 10.0);
        let measurement = subject.measure()?;
        let mut strategy = TrustRegionStrategy::new(
            Box::new(GradientDescent::new()),
            Arc::new(DistanceConstraint::new(0.5)),
        );
        assert_eq!(strategy.kind(), "TrustRegion[distance](GradientDescent)");

        let mut monitor = RecordingMonitor::default();
        let mut cursor = strategy.orient(&mut subject, measurement, &mut monitor)?;
        cursor.step(10.0, &mut monitor)?;
        assert_abs_diff_eq!(weight.value().data()[0], 0.5, epsilon = 1e-12);
        Ok(())
    }
}
