//! Step-size search and iterative training on top of `deltagraph-core`.
//!
//! An [`IterativeTrainer`](trainer::IterativeTrainer) repeatedly measures a
//! [`Trainable`](deltagraph_core::Trainable), asks an
//! [`Orientation`](orientation::Orientation) for a direction, and hands the
//! resulting [`LineSearchCursor`](cursor::LineSearchCursor) to a
//! [`LineSearchStrategy`](line_search::LineSearchStrategy). Trust regions
//! constrain where probes may land.

pub mod cursor;
pub mod error;
pub mod line_search;
pub mod monitor;
pub mod orientation;
pub mod trainer;
pub mod trust_region;

#[cfg(test)]
mod test_support;

pub use cursor::{FailsafeLineSearchCursor, LineSearchCursor, LineSearchPoint, SimpleLineSearchCursor};
pub use error::OptimError;
pub use line_search::{BisectionConfig, BisectionSearch, LineSearchStrategy};
pub use monitor::{LogMonitor, Monitor, RecordingMonitor, StepRecord};
pub use orientation::{GradientDescent, Lbfgs, Orientation, TrustRegionStrategy};
pub use trainer::{IterativeTrainer, TerminationReason, TrainerConfig, TrainingSummary};
pub use trust_region::{DistanceConstraint, SingleOrthant, TrustRegion};
