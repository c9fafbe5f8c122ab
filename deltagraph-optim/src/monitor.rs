use deltagraph_core::PointSample;
use std::time::Duration;

/// Summary of one completed trainer iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub iteration: usize,
    pub orientation: String,
    pub previous_value: f64,
    pub value: f64,
    pub rate: f64,
    pub elapsed: Duration,
}

/// Receives progress from line searches and the trainer.
///
/// Nothing a monitor returns is consumed by the optimizer.
pub trait Monitor: Send {
    fn log(&mut self, msg: &str);

    fn on_step_complete(&mut self, _step: &StepRecord) {}

    /// Called by the failsafe cursor whenever a probe beats every earlier one.
    fn on_new_minimum(&mut self, _point: &PointSample) {}
}

/// Forwards every line to the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMonitor;

impl Monitor for LogMonitor {
    fn log(&mut self, msg: &str) {
        log::info!("{}", msg);
    }

    fn on_step_complete(&mut self, step: &StepRecord) {
        log::info!(
            "iteration {} [{}]: {:.6e} -> {:.6e} at rate {:.3e} ({:?})",
            step.iteration,
            step.orientation,
            step.previous_value,
            step.value,
            step.rate,
            step.elapsed
        );
    }

    fn on_new_minimum(&mut self, point: &PointSample) {
        log::debug!("new minimum {:.6e} at rate {:.3e}", point.value(), point.rate());
    }
}

/// Keeps everything it is told. Useful for inspecting a run after the fact.
#[derive(Debug, Default, Clone)]
pub struct RecordingMonitor {
    pub lines: Vec<String>,
    pub steps: Vec<StepRecord>,
    pub minima: Vec<f64>,
}

impl Monitor for RecordingMonitor {
    fn log(&mut self, msg: &str) {
        log::debug!("{}", msg);
        self.lines.push(msg.to_string());
    }

    fn on_step_complete(&mut self, step: &StepRecord) {
        self.steps.push(step.clone());
    }

    fn on_new_minimum(&mut self, point: &PointSample) {
        self.minima.push(point.value());
    }
}
