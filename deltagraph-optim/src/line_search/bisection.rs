use super::{BestPoint, LineSearchStrategy};
use crate::cursor::{LineSearchCursor, LineSearchPoint};
use crate::error::OptimError;
use crate::monitor::Monitor;
use deltagraph_core::PointSample;
use serde::{Deserialize, Serialize};

/// Tunables for [`BisectionSearch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BisectionConfig {
    /// First rate probed while bracketing. Updated after every search.
    pub current_rate: f64,
    /// Derivatives with magnitude at or below this count as zero.
    pub zero_tol: f64,
    /// Bisection stops once `ln(right / left)` drops below this.
    pub rel_tol: f64,
    pub max_bracket_iterations: usize,
    pub max_bisect_iterations: usize,
    /// Skip bisection when bracketing had to grow past `current_rate`, and
    /// take the best bracketing probe directly.
    ///
    /// Off by default, unlike the behaviour this search is modelled on, which
    /// always takes this exit. With it on, a search on `(x - 3)^2` from rate 1
    /// stops at the bracketing probe 2 instead of refining toward 3.
    pub overshoot_exit: bool,
}

impl Default for BisectionConfig {
    fn default() -> Self {
        BisectionConfig {
            current_rate: 1.0,
            zero_tol: 1e-20,
            rel_tol: 1e-1,
            max_bracket_iterations: 100,
            max_bisect_iterations: 1000,
            overshoot_exit: false,
        }
    }
}

impl BisectionConfig {
    pub fn with_current_rate(mut self, rate: f64) -> Self {
        self.current_rate = rate;
        self
    }

    pub fn with_zero_tol(mut self, zero_tol: f64) -> Self {
        self.zero_tol = zero_tol;
        self
    }

    pub fn with_rel_tol(mut self, rel_tol: f64) -> Self {
        self.rel_tol = rel_tol;
        self
    }

    pub fn with_overshoot_exit(mut self, overshoot_exit: bool) -> Self {
        self.overshoot_exit = overshoot_exit;
        self
    }
}

/// Bracket-then-bisect search on the sign of the directional derivative.
///
/// Bracketing doubles the rate from `current_rate` while the loss keeps
/// falling and the derivative stays negative. The first probe that fails
/// either test becomes the right edge. Bisection then halves `[left, right]`
/// on the sign of the derivative at the midpoint until the derivative is
/// zero within `zero_tol` or the bracket is narrow on a log scale.
///
/// Only derivative signs and value comparisons are used, so the search also
/// works on objectives with kinks such as `|x - c|`.
#[derive(Debug, Clone, Default)]
pub struct BisectionSearch {
    config: BisectionConfig,
}

enum Bracket {
    Found { left: LineSearchPoint, right: f64 },
    Abandoned,
}

impl BisectionSearch {
    pub fn new(config: BisectionConfig) -> Self {
        BisectionSearch { config }
    }

    pub fn config(&self) -> &BisectionConfig {
        &self.config
    }

    pub fn current_rate(&self) -> f64 {
        self.config.current_rate
    }

    fn bracket(
        &self,
        cursor: &mut dyn LineSearchCursor,
        origin: &LineSearchPoint,
        best: &mut BestPoint,
        monitor: &mut dyn Monitor,
    ) -> Result<Bracket, OptimError> {
        let mut left = origin.clone();
        let mut rate = if self.config.current_rate > 0.0 && self.config.current_rate.is_finite() {
            self.config.current_rate
        } else {
            1.0
        };
        for _ in 0..self.config.max_bracket_iterations {
            if !rate.is_finite() {
                log::warn!("bracketing overflowed past rate {:.3e}", left.rate());
                return Ok(Bracket::Abandoned);
            }
            let probe = cursor.step(rate, monitor)?;
            best.offer(&probe.point);
            let uphill = !probe.value().is_finite() || probe.value() > left.value();
            if uphill || probe.derivative >= 0.0 {
                return Ok(Bracket::Found { left, right: rate });
            }
            left = probe;
            rate *= 2.0;
        }
        log::warn!(
            "no upper bound found within {} bracketing steps",
            self.config.max_bracket_iterations
        );
        Ok(Bracket::Abandoned)
    }

    fn bisect(
        &self,
        cursor: &mut dyn LineSearchCursor,
        mut left: LineSearchPoint,
        mut right: f64,
        best: &mut BestPoint,
        monitor: &mut dyn Monitor,
    ) -> Result<(), OptimError> {
        for _ in 0..self.config.max_bisect_iterations {
            let lo = left.rate();
            if lo > 0.0 && (right / lo).ln() < self.config.rel_tol {
                return Ok(());
            }
            let mid = 0.5 * (lo + right);
            if mid <= lo || mid >= right {
                return Ok(());
            }
            let probe = cursor.step(mid, monitor)?;
            best.offer(&probe.point);
            if probe.derivative.abs() <= self.config.zero_tol {
                return Ok(());
            }
            let uphill = !probe.value().is_finite() || probe.value() > left.value();
            if uphill || probe.derivative > 0.0 {
                right = mid;
            } else {
                left = probe;
            }
        }
        log::warn!(
            "bisection stopped after {} iterations",
            self.config.max_bisect_iterations
        );
        Ok(())
    }

    fn finish(&mut self, best: BestPoint, monitor: &mut dyn Monitor) -> PointSample {
        let best = best.into_inner();
        if best.rate() > 0.0 {
            self.config.current_rate = best.rate();
        } else {
            self.config.current_rate *= 0.5;
        }
        monitor.log(&format!(
            "bisection settled at rate {:.6e} with value {:.6e}; next start {:.6e}",
            best.rate(),
            best.value(),
            self.config.current_rate
        ));
        best
    }
}

impl LineSearchStrategy for BisectionSearch {
    fn step(
        &mut self,
        cursor: &mut dyn LineSearchCursor,
        monitor: &mut dyn Monitor,
    ) -> Result<PointSample, OptimError> {
        let origin = cursor.step(0.0, monitor)?;
        let mut best = BestPoint::new(origin.point.clone());
        if origin.derivative >= 0.0 || origin.derivative.is_nan() {
            monitor.log(&format!(
                "direction is not a descent direction (derivative {:.6e})",
                origin.derivative
            ));
            return Ok(self.finish(best, monitor));
        }

        let (left, right) = match self.bracket(cursor, &origin, &mut best, monitor)? {
            Bracket::Found { left, right } => (left, right),
            Bracket::Abandoned => return Ok(self.finish(best, monitor)),
        };
        if self.config.overshoot_exit && self.config.current_rate < right {
            log::debug!("overshoot exit at right edge {:.3e}", right);
            return Ok(self.finish(best, monitor));
        }
        self.bisect(cursor, left, right, &mut best, monitor)?;
        Ok(self.finish(best, monitor))
    }

    fn name(&self) -> &str {
        "bisection"
    }
}

#[cfg(test)]
#[path = "bisection_test.rs"]
mod tests;
