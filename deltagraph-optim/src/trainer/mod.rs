//! The outer optimization loop.

pub mod iterative;

pub use iterative::IterativeTrainer;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Stopping rules for [`IterativeTrainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub max_iterations: usize,
    pub timeout: Duration,
    /// Stop as soon as the loss is at or below this value.
    pub termination_threshold: f64,
    /// A step must lower the loss by more than this to count as progress.
    pub min_improvement: f64,
    /// On stagnation, ask the trainable for a new batch before giving up.
    pub reset_on_stagnation: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            max_iterations: 100,
            timeout: Duration::from_secs(300),
            termination_threshold: 0.0,
            min_improvement: 0.0,
            reset_on_stagnation: true,
        }
    }
}

impl TrainerConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_termination_threshold(mut self, threshold: f64) -> Self {
        self.termination_threshold = threshold;
        self
    }

    pub fn with_min_improvement(mut self, min_improvement: f64) -> Self {
        self.min_improvement = min_improvement;
        self
    }

    pub fn with_reset_on_stagnation(mut self, reset: bool) -> Self {
        self.reset_on_stagnation = reset;
        self
    }
}

/// Why a training run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// No step improved the loss by more than `min_improvement`.
    Converged,
    /// The loss reached `termination_threshold`.
    Threshold,
    MaxIterations,
    Timeout,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::Converged => write!(f, "converged"),
            TerminationReason::Threshold => write!(f, "threshold reached"),
            TerminationReason::MaxIterations => write!(f, "iteration limit"),
            TerminationReason::Timeout => write!(f, "timeout"),
        }
    }
}

/// Outcome of [`IterativeTrainer::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub iterations: usize,
    pub initial_value: f64,
    pub final_value: f64,
    pub reason: TerminationReason,
    pub elapsed: Duration,
}
