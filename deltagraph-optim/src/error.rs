use deltagraph_core::GraphError;
use thiserror::Error;

/// Errors raised by line searches, orientations and the trainer.
///
/// Non-convergence of a line search and stagnation of the trainer are not
/// errors; they end as a returned point or a
/// [`TerminationReason`](crate::trainer::TerminationReason).
#[derive(Error, Debug, PartialEq, Clone)]
pub enum OptimError {
    /// A measurement or parameter update failed in the graph engine.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A tunable was out of range.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An orientation could not produce a direction.
    #[error("Orientation '{orientation}' produced no usable direction: {reason}")]
    InvalidDirection { orientation: String, reason: String },
}
