use super::{BestPoint, LineSearchStrategy};
use crate::cursor::LineSearchCursor;
use crate::error::OptimError;
use crate::monitor::Monitor;
use deltagraph_core::PointSample;
use serde::{Deserialize, Serialize};

/// Tunables for [`ArmijoWolfeSearch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmijoWolfeConfig {
    pub current_rate: f64,
    /// Sufficient-decrease constant.
    pub c1: f64,
    /// Curvature constant; must satisfy `c1 < c2 < 1`.
    pub c2: f64,
    pub min_rate: f64,
    pub max_rate: f64,
    pub max_iterations: usize,
}

impl Default for ArmijoWolfeConfig {
    fn default() -> Self {
        ArmijoWolfeConfig {
            current_rate: 1.0,
            c1: 1e-4,
            c2: 0.9,
            min_rate: 1e-20,
            max_rate: 1e20,
            max_iterations: 50,
        }
    }
}

impl ArmijoWolfeConfig {
    pub fn with_current_rate(mut self, rate: f64) -> Self {
        self.current_rate = rate;
        self
    }

    pub fn with_constants(mut self, c1: f64, c2: f64) -> Self {
        self.c1 = c1;
        self.c2 = c2;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Weak Wolfe search: accepts the first rate with sufficient decrease
/// (Armijo) and a derivative no steeper than `c2` times the initial one.
///
/// Rates that fail sufficient decrease shrink the bracket from the right,
/// rates that are too short grow it from the left (doubling while no right
/// edge is known).
#[derive(Debug, Clone, Default)]
pub struct ArmijoWolfeSearch {
    config: ArmijoWolfeConfig,
}

impl ArmijoWolfeSearch {
    pub fn new(config: ArmijoWolfeConfig) -> Result<Self, OptimError> {
        if !(0.0 < config.c1 && config.c1 < config.c2 && config.c2 < 1.0) {
            return Err(OptimError::ConfigurationError(format!(
                "Wolfe constants must satisfy 0 < c1 < c2 < 1, got c1={} c2={}",
                config.c1, config.c2
            )));
        }
        Ok(ArmijoWolfeSearch { config })
    }

    pub fn current_rate(&self) -> f64 {
        self.config.current_rate
    }
}

impl LineSearchStrategy for ArmijoWolfeSearch {
    fn step(
        &mut self,
        cursor: &mut dyn LineSearchCursor,
        monitor: &mut dyn Monitor,
    ) -> Result<PointSample, OptimError> {
        let origin = cursor.step(0.0, monitor)?;
        let mut best = BestPoint::new(origin.point.clone());
        let (f0, d0) = (origin.value(), origin.derivative);
        if d0 >= 0.0 || d0.is_nan() {
            monitor.log(&format!("direction is not a descent direction (derivative {:.6e})", d0));
            self.config.current_rate *= 0.5;
            return Ok(best.into_inner());
        }

        let mut lo = 0.0;
        let mut hi = f64::INFINITY;
        let mut rate = self.config.current_rate.clamp(self.config.min_rate, self.config.max_rate);
        let mut accepted = None;
        for _ in 0..self.config.max_iterations {
            let probe = cursor.step(rate, monitor)?;
            best.offer(&probe.point);
            if !probe.value().is_finite() || probe.value() > f0 + self.config.c1 * rate * d0 {
                hi = rate;
            } else if probe.derivative < self.config.c2 * d0 {
                lo = rate;
            } else {
                accepted = Some(probe.point);
                break;
            }
            rate = if hi.is_finite() { 0.5 * (lo + hi) } else { 2.0 * rate };
            if rate < self.config.min_rate || rate > self.config.max_rate {
                log::warn!("armijo-wolfe rate {:.3e} left [{:.1e}, {:.1e}]", rate, self.config.min_rate, self.config.max_rate);
                break;
            }
        }

        let result = match accepted {
            Some(point) => point,
            None => best.into_inner(),
        };
        if result.rate() > 0.0 {
            self.config.current_rate = result.rate();
        } else {
            self.config.current_rate *= 0.5;
        }
        monitor.log(&format!(
            "armijo-wolfe settled at rate {:.6e} with value {:.6e}",
            result.rate(),
            result.value()
        ));
        Ok(result)
    }

    fn name(&self) -> &str {
        "armijo_wolfe"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::RecordingMonitor;
    use crate::test_support::FunctionCursor;

    fn parabola(alpha: f64) -> (f64, f64) {
        ((alpha - 3.0).powi(2), 2.0 * (alpha - 3.0))
    }

    #[test]
    fn test_accepted_rate_satisfies_wolfe_conditions() -> Result<(), OptimError> {
        let mut search = ArmijoWolfeSearch::default();
        let mut cursor = FunctionCursor::new(parabola);
        let mut monitor = RecordingMonitor::default();

        let point = search.step(&mut cursor, &mut monitor)?;
        let (f0, d0) = parabola(0.0);
        let (f, d) = parabola(point.rate());
        assert!(f <= f0 + 1e-4 * point.rate() * d0);
        assert!(d >= 0.9 * d0);
        assert_eq!(search.current_rate(), point.rate());
        Ok(())
    }

    #[test]
    fn test_overlong_first_step_is_shortened() -> Result<(), OptimError> {
        let mut search = ArmijoWolfeSearch::new(ArmijoWolfeConfig::default().with_current_rate(100.0))?;
        let mut cursor = FunctionCursor::new(parabola);
        let point = search.step(&mut cursor, &mut RecordingMonitor::default())?;
        assert!(point.rate() < 6.0);
        assert!(point.value() < 9.0);
        Ok(())
    }

    #[test]
    fn test_rejects_bad_constants() {
        let config = ArmijoWolfeConfig::default().with_constants(0.9, 0.1);
        assert!(matches!(
            ArmijoWolfeSearch::new(config),
            Err(OptimError::ConfigurationError(_))
        ));
    }
}
