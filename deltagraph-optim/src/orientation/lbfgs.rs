use super::Orientation;
use crate::error::OptimError;
use crate::monitor::Monitor;
use deltagraph_core::nn::ParamId;
use deltagraph_core::{DeltaSet, PointSample};
use std::collections::VecDeque;

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[derive(Debug, Clone)]
struct Correction {
    s: Vec<f64>,
    y: Vec<f64>,
    rho: f64,
}

#[derive(Debug, Clone)]
struct Previous {
    keys: Vec<ParamId>,
    weights: Vec<f64>,
    gradient: Vec<f64>,
}

/// Limited-memory BFGS.
///
/// Keeps the last `memory` displacement/gradient-change pairs between
/// consecutive measurements and applies the two-loop recursion to the
/// current gradient. Pairs with non-positive curvature are skipped. When the
/// resulting direction is not downhill the history is dropped and steepest
/// descent is used for that step.
#[derive(Debug, Clone)]
pub struct Lbfgs {
    memory: usize,
    history: VecDeque<Correction>,
    previous: Option<Previous>,
}

impl Default for Lbfgs {
    fn default() -> Self {
        Lbfgs::new(10)
    }
}

impl Lbfgs {
    pub fn new(memory: usize) -> Self {
        Lbfgs {
            memory: memory.max(1),
            history: VecDeque::new(),
            previous: None,
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn record(&mut self, keys: &[ParamId], weights: &[f64], gradient: &[f64]) {
        if let Some(prev) = &self.previous {
            if prev.keys == keys {
                let s: Vec<f64> = weights.iter().zip(&prev.weights).map(|(a, b)| a - b).collect();
                let y: Vec<f64> = gradient.iter().zip(&prev.gradient).map(|(a, b)| a - b).collect();
                let sy = dot(&s, &y);
                if sy > 1e-12 {
                    if self.history.len() == self.memory {
                        self.history.pop_front();
                    }
                    self.history.push_back(Correction { s, y, rho: 1.0 / sy });
                } else {
                    log::debug!("lbfgs skipped a pair with curvature {:.3e}", sy);
                }
            } else {
                self.history.clear();
            }
        }
        self.previous = Some(Previous {
            keys: keys.to_vec(),
            weights: weights.to_vec(),
            gradient: gradient.to_vec(),
        });
    }

    /// Two-loop recursion: approximates `H * gradient`.
    fn apply_inverse_hessian(&self, gradient: &[f64]) -> Vec<f64> {
        let mut q = gradient.to_vec();
        let mut alphas = Vec::with_capacity(self.history.len());
        for c in self.history.iter().rev() {
            let a = c.rho * dot(&c.s, &q);
            q.iter_mut().zip(&c.y).for_each(|(qi, yi)| *qi -= a * yi);
            alphas.push(a);
        }
        if let Some(last) = self.history.back() {
            let gamma = dot(&last.s, &last.y) / dot(&last.y, &last.y);
            q.iter_mut().for_each(|qi| *qi *= gamma);
        }
        for (c, a) in self.history.iter().zip(alphas.iter().rev()) {
            let b = c.rho * dot(&c.y, &q);
            q.iter_mut().zip(&c.s).for_each(|(qi, si)| *qi += (a - b) * si);
        }
        q
    }
}

impl Orientation for Lbfgs {
    fn kind(&self) -> &str {
        "LBFGS"
    }

    fn direction(
        &mut self,
        measurement: &PointSample,
        monitor: &mut dyn Monitor,
    ) -> Result<DeltaSet, OptimError> {
        let gradient_set = measurement.delta();
        let keys: Vec<ParamId> = gradient_set.keys().collect();
        let gradient = gradient_set.to_vector();
        let weights = measurement.weights().vector_for(&keys)?;
        self.record(&keys, &weights, &gradient);

        let mut direction: Vec<f64> = self.apply_inverse_hessian(&gradient).iter().map(|v| -v).collect();
        let slope = dot(&direction, &gradient);
        if slope >= 0.0 || slope.is_nan() || direction.iter().any(|v| !v.is_finite()) {
            monitor.log(&format!(
                "lbfgs direction not downhill (slope {:.3e}); falling back to steepest descent",
                slope
            ));
            self.history.clear();
            direction = gradient.iter().map(|g| -g).collect();
        }
        Ok(gradient_set.from_vector(&direction)?)
    }

    fn reset(&mut self) {
        self.history.clear();
        self.previous = None;
    }
}
