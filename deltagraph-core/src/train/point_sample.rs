use crate::autograd::delta_set::DeltaSet;
use crate::autograd::state_set::StateSet;
use crate::error::GraphError;

/// Loss, gradient and parameter snapshot taken at one position in parameter space.
///
/// `delta` is the gradient of the mean loss and `weights` the parameter
/// values it was computed at; both come from the same evaluation. `rate` is
/// the step size along the current search direction at which the point was
/// taken (zero for the origin of a line search).
#[derive(Debug, Clone)]
pub struct PointSample {
    delta: DeltaSet,
    weights: StateSet,
    sum: f64,
    count: usize,
    rate: f64,
}

impl PointSample {
    pub fn new(delta: DeltaSet, weights: StateSet, sum: f64, count: usize) -> Self {
        PointSample {
            delta,
            weights,
            sum,
            count,
            rate: 0.0,
        }
    }

    /// Mean loss over the measured items.
    pub fn value(&self) -> f64 {
        if self.count == 0 {
            return self.sum;
        }
        self.sum / self.count as f64
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn delta(&self) -> &DeltaSet {
        &self.delta
    }

    pub fn weights(&self) -> &StateSet {
        &self.weights
    }

    /// Writes the snapshot back into the parameters.
    pub fn restore(&self) -> Result<(), GraphError> {
        self.weights.restore()
    }
}
