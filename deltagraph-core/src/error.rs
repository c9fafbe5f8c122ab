use thiserror::Error;

/// Which half of an evaluation cycle produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Forward,
    Backward,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Forward => write!(f, "forward"),
            Stage::Backward => write!(f, "backward"),
        }
    }
}

/// Custom error type for the deltagraph engine.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum GraphError {
    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("Arity mismatch in {operation}: expected {expected} inputs, got {actual}")]
    ArityMismatch {
        expected: usize,
        actual: usize,
        operation: String,
    },

    #[error("Batch length mismatch in {operation}: expected {expected} items, got {actual}")]
    BatchMismatch {
        expected: usize,
        actual: usize,
        operation: String,
    },

    #[error("Tensor creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreationError { data_len: usize, shape: Vec<usize> },

    #[error("Non-finite value produced by {operation} during {stage}")]
    NonFinite { operation: String, stage: Stage },

    #[error("Backward already consumed for result produced by {operation}")]
    BackwardConsumed { operation: String },

    #[error("Unknown node {0} referenced by graph edge")]
    UnknownNode(usize),

    #[error("Unknown external input {index}; network declares {available} inputs")]
    UnknownInput { index: usize, available: usize },

    #[error("Unknown parameter id {0}")]
    UnknownParameter(u64),

    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Cannot evaluate an empty batch")]
    EmptyBatch,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock poisoned: {0}")]
    LockError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}
