use crate::error::OptimError;
use crate::monitor::Monitor;
use crate::trust_region::TrustRegion;
use deltagraph_core::nn::ParamId;
use deltagraph_core::{DeltaSet, GraphError, PointSample, StateSet, Trainable};
use std::sync::Arc;

/// A probe along a search direction.
#[derive(Debug, Clone)]
pub struct LineSearchPoint {
    /// Measurement at the probed position, tagged with its rate.
    pub point: PointSample,
    /// Directional derivative of the loss along the effective direction.
    pub derivative: f64,
}

impl LineSearchPoint {
    pub fn value(&self) -> f64 {
        self.point.value()
    }

    pub fn rate(&self) -> f64 {
        self.point.rate()
    }
}

/// A one-dimensional view of the loss along a fixed direction.
///
/// `step(alpha)` moves the parameters to `origin + alpha * direction`
/// (possibly projected), measures there and reports the value and the
/// directional derivative. The parameters are left at the probed position;
/// the caller restores whichever point it settles on.
pub trait LineSearchCursor {
    /// Names the kind of direction this cursor walks, e.g. `"GradientDescent"`.
    fn direction_kind(&self) -> &str;

    fn step(&mut self, alpha: f64, monitor: &mut dyn Monitor) -> Result<LineSearchPoint, OptimError>;

    /// The measurement the direction was computed from.
    fn origin(&self) -> &PointSample;

    /// Puts the parameters back at the origin.
    fn reset(&mut self) -> Result<(), OptimError> {
        self.origin().restore()?;
        Ok(())
    }
}

/// Walks `origin + alpha * direction` on a [`Trainable`], optionally through
/// a trust region.
pub struct SimpleLineSearchCursor<'a> {
    subject: &'a mut dyn Trainable,
    origin: PointSample,
    direction: DeltaSet,
    keys: Vec<ParamId>,
    kind: String,
    region: Option<Arc<dyn TrustRegion>>,
}

impl<'a> SimpleLineSearchCursor<'a> {
    pub fn new(
        subject: &'a mut dyn Trainable,
        origin: PointSample,
        direction: DeltaSet,
        kind: impl Into<String>,
    ) -> Self {
        let keys = direction.keys().collect();
        SimpleLineSearchCursor {
            subject,
            origin: origin.with_rate(0.0),
            direction,
            keys,
            kind: kind.into(),
            region: None,
        }
    }

    pub fn with_trust_region(mut self, region: Arc<dyn TrustRegion>) -> Self {
        self.region = Some(region);
        self
    }

    pub fn direction(&self) -> &DeltaSet {
        &self.direction
    }

    /// Moves the parameters to the candidate for `alpha` and returns the
    /// direction actually taken, per unit of `alpha`.
    fn position(&self, alpha: f64) -> Result<DeltaSet, GraphError> {
        let candidate: StateSet = self.origin.weights().add_delta(&self.direction, alpha)?;
        let region = match &self.region {
            Some(region) => region,
            None => {
                candidate.restore()?;
                return Ok(self.direction.clone());
            }
        };
        let current = self.origin.weights().vector_for(&self.keys)?;
        let proposed = candidate.vector_for(&self.keys)?;
        let projected = region.project(&current, &proposed);
        candidate.write_vector(&self.keys, &projected)?;
        let effective: Vec<f64> = current
            .iter()
            .zip(&projected)
            .map(|(c, p)| (p - c) / alpha)
            .collect();
        self.direction.from_vector(&effective)
    }

    fn origin_point(&self) -> Result<LineSearchPoint, GraphError> {
        let derivative = self.origin.delta().dot(&self.direction)?;
        Ok(LineSearchPoint {
            point: self.origin.clone(),
            derivative,
        })
    }
}

impl<'a> LineSearchCursor for SimpleLineSearchCursor<'a> {
    fn direction_kind(&self) -> &str {
        &self.kind
    }

    fn step(&mut self, alpha: f64, monitor: &mut dyn Monitor) -> Result<LineSearchPoint, OptimError> {
        self.origin.restore()?;
        if alpha == 0.0 {
            return Ok(self.origin_point()?);
        }
        let effective = self.position(alpha)?;
        let probe = match self.subject.measure() {
            Ok(sample) => {
                let derivative = sample.delta().dot(&effective)?;
                LineSearchPoint {
                    point: sample.with_rate(alpha),
                    derivative,
                }
            }
            // A probe that blows up counts as an infinitely bad point.
            Err(GraphError::NonFinite { operation, stage }) => {
                log::warn!(
                    "probe at rate {:.3e} hit a non-finite value in {} ({}); treating as uphill",
                    alpha,
                    operation,
                    stage
                );
                let weights = StateSet::capture(&self.origin.weights().params());
                LineSearchPoint {
                    point: PointSample::new(DeltaSet::new(), weights, f64::INFINITY, 1).with_rate(alpha),
                    derivative: f64::INFINITY,
                }
            }
            Err(e) => return Err(e.into()),
        };
        monitor.log(&format!(
            "[{}] rate {:.6e}: value {:.6e}, derivative {:.6e}",
            self.kind,
            alpha,
            probe.value(),
            probe.derivative
        ));
        Ok(probe)
    }

    fn origin(&self) -> &PointSample {
        &self.origin
    }
}

/// Wraps a cursor and remembers the lowest point it has seen.
///
/// However a line search ends, the trainer can fall back on
/// [`FailsafeLineSearchCursor::best`], so a search that wanders off never
/// loses an improvement it already found.
pub struct FailsafeLineSearchCursor<'a> {
    inner: Box<dyn LineSearchCursor + 'a>,
    best: PointSample,
}

impl<'a> FailsafeLineSearchCursor<'a> {
    pub fn new(inner: Box<dyn LineSearchCursor + 'a>) -> Self {
        let best = inner.origin().clone();
        FailsafeLineSearchCursor { inner, best }
    }

    pub fn best(&self) -> &PointSample {
        &self.best
    }

    pub fn into_best(self) -> PointSample {
        self.best
    }

    /// Offers a point found elsewhere; kept if it beats the current best.
    pub fn accept(&mut self, point: &PointSample, monitor: &mut dyn Monitor) -> bool {
        if point.value() < self.best.value() {
            self.best = point.clone();
            monitor.on_new_minimum(point);
            true
        } else {
            false
        }
    }
}

impl<'a> LineSearchCursor for FailsafeLineSearchCursor<'a> {
    fn direction_kind(&self) -> &str {
        self.inner.direction_kind()
    }

    fn step(&mut self, alpha: f64, monitor: &mut dyn Monitor) -> Result<LineSearchPoint, OptimError> {
        let probe = self.inner.step(alpha, monitor)?;
        self.accept(&probe.point, monitor);
        Ok(probe)
    }

    fn origin(&self) -> &PointSample {
        self.inner.origin()
    }

    fn reset(&mut self) -> Result<(), OptimError> {
        self.inner.reset()
    }
}

#[cfg(test)]
#[path = "cursor_test.rs"]
mod tests;
