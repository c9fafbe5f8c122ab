use super::{TerminationReason, TrainerConfig, TrainingSummary};
use crate::cursor::FailsafeLineSearchCursor;
use crate::error::OptimError;
use crate::line_search::{BisectionSearch, LineSearchStrategy};
use crate::monitor::{LogMonitor, Monitor, StepRecord};
use crate::orientation::{GradientDescent, Orientation};
use deltagraph_core::{PointSample, Trainable};
use std::collections::HashMap;
use std::time::Instant;

type LineSearchFactory = Box<dyn Fn(&str) -> Box<dyn LineSearchStrategy> + Send>;

/// Measure, orient, search, commit; repeated until a stopping rule fires.
///
/// Line searches are created lazily, one per orientation kind, and kept for
/// the trainer's lifetime so their warm-start rates carry over between
/// iterations and between runs.
pub struct IterativeTrainer {
    config: TrainerConfig,
    orientation: Box<dyn Orientation>,
    factory: LineSearchFactory,
    line_searches: HashMap<String, Box<dyn LineSearchStrategy>>,
    monitor: Box<dyn Monitor>,
}

impl Default for IterativeTrainer {
    fn default() -> Self {
        IterativeTrainer::new(TrainerConfig::default())
    }
}

impl IterativeTrainer {
    /// Steepest descent with bisection line search, logging through `log`.
    pub fn new(config: TrainerConfig) -> Self {
        IterativeTrainer {
            config,
            orientation: Box::new(GradientDescent::new()),
            factory: Box::new(|_: &str| -> Box<dyn LineSearchStrategy> {
                Box::new(BisectionSearch::default())
            }),
            line_searches: HashMap::new(),
            monitor: Box::new(LogMonitor),
        }
    }

    pub fn with_orientation(mut self, orientation: Box<dyn Orientation>) -> Self {
        self.orientation = orientation;
        self
    }

    /// Replaces the line-search factory. Searches already cached are dropped.
    pub fn with_line_search<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str) -> Box<dyn LineSearchStrategy> + Send + 'static,
    {
        self.factory = Box::new(factory);
        self.line_searches.clear();
        self
    }

    pub fn with_monitor(mut self, monitor: Box<dyn Monitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn monitor(&self) -> &dyn Monitor {
        self.monitor.as_ref()
    }

    pub fn into_monitor(self) -> Box<dyn Monitor> {
        self.monitor
    }

    /// Number of distinct orientation kinds a line search has been created for.
    pub fn cached_line_searches(&self) -> usize {
        self.line_searches.len()
    }

    /// One orientation plus line search from `current`. Parameters are left
    /// at the returned point.
    fn iterate(
        &mut self,
        subject: &mut dyn Trainable,
        current: &PointSample,
    ) -> Result<PointSample, OptimError> {
        let kind = self.orientation.kind().to_string();
        let cursor = self
            .orientation
            .orient(subject, current.clone(), self.monitor.as_mut())?;
        let mut failsafe = FailsafeLineSearchCursor::new(cursor);
        let factory = &self.factory;
        let search = self
            .line_searches
            .entry(kind)
            .or_insert_with_key(|kind| factory(kind));
        let found = search.step(&mut failsafe, self.monitor.as_mut())?;
        failsafe.accept(&found, self.monitor.as_mut());
        let best = failsafe.into_best();
        best.restore()?;
        Ok(best)
    }

    /// Trains `subject` in place and reports why it stopped.
    ///
    /// On return the parameters hold the best point committed.
    pub fn run(&mut self, subject: &mut dyn Trainable) -> Result<TrainingSummary, OptimError> {
        let start = Instant::now();
        let mut current = subject.measure()?;
        let initial_value = current.value();
        self.monitor.log(&format!(
            "starting {} from value {:.6e}",
            self.orientation.kind(),
            initial_value
        ));

        let mut iterations = 0;
        let reason = loop {
            if current.value() <= self.config.termination_threshold {
                break TerminationReason::Threshold;
            }
            if iterations >= self.config.max_iterations {
                break TerminationReason::MaxIterations;
            }
            if start.elapsed() >= self.config.timeout {
                break TerminationReason::Timeout;
            }
            iterations += 1;

            let previous_value = current.value();
            let best = self.iterate(subject, &current)?;
            if previous_value - best.value() <= self.config.min_improvement {
                current.restore()?;
                if self.config.reset_on_stagnation && subject.reset_sampling() {
                    self.monitor.log(&format!(
                        "iteration {} stagnated at {:.6e}; resampled",
                        iterations, previous_value
                    ));
                    self.orientation.reset();
                    current = subject.measure()?;
                    continue;
                }
                break TerminationReason::Converged;
            }

            let rate = best.rate();
            current = best.with_rate(0.0);
            self.monitor.on_step_complete(&StepRecord {
                iteration: iterations,
                orientation: self.orientation.kind().to_string(),
                previous_value,
                value: current.value(),
                rate,
                elapsed: start.elapsed(),
            });
        };

        let summary = TrainingSummary {
            iterations,
            initial_value,
            final_value: current.value(),
            reason,
            elapsed: start.elapsed(),
        };
        self.monitor.log(&format!(
            "stopped after {} iteration(s): {} ({:.6e} -> {:.6e})",
            summary.iterations, summary.reason, summary.initial_value, summary.final_value
        ));
        Ok(summary)
    }
}
