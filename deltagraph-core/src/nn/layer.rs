use crate::autograd::result::ResultRef;
use crate::error::GraphError;
use crate::nn::parameter::Parameter;
use crate::nn::state::LayerState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LAYER_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a layer instance. Survives persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub u64);

impl LayerId {
    pub fn next() -> Self {
        LayerId(NEXT_LAYER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Moves the id counter past `id` so freshly created layers never
    /// collide with one restored from a saved state.
    pub fn reserve(id: LayerId) {
        NEXT_LAYER_ID.fetch_max(id.0 + 1, Ordering::Relaxed);
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

/// The base trait for every node operation in a [`DagNetwork`](crate::dag::DagNetwork).
///
/// A layer maps a list of input results (each holding one tensor per batch
/// item) to one output result whose backward op knows how to push the output
/// gradient into the layer's parameters and back to its live inputs.
pub trait Layer: fmt::Debug + Send + Sync {
    fn id(&self) -> LayerId;

    fn name(&self) -> &str;

    /// Performs the forward evaluation of the layer for a whole batch.
    ///
    /// # Arguments
    /// * `inputs`: One result per incoming edge, in edge order. All inputs
    ///    carry the same number of batch items.
    ///
    /// # Returns
    /// The output result. It is alive iff the layer has a non-frozen
    /// parameter or any input is alive; live inputs are attached to it.
    ///
    /// # Errors
    /// Arity, batch and shape mismatches, and non-finite outputs.
    fn eval(&self, inputs: &[ResultRef]) -> Result<ResultRef, GraphError>;

    /// Parameters owned (or shared) by this layer.
    fn parameters(&self) -> Vec<Parameter> {
        Vec::new()
    }

    /// `true` if gradients must not be accumulated for this layer's parameters.
    fn is_frozen(&self) -> bool;

    fn set_frozen(&mut self, frozen: bool);

    /// Serializable description sufficient to rebuild an equivalent layer.
    fn to_state(&self) -> LayerState;

    /// `true` if this layer contributes to liveness on its own.
    fn is_trainable(&self) -> bool {
        !self.is_frozen() && !self.parameters().is_empty()
    }
}

/// Fails unless exactly `expected` inputs were given.
pub(crate) fn check_arity(
    inputs: &[ResultRef],
    expected: usize,
    operation: &str,
) -> Result<(), GraphError> {
    if inputs.len() != expected {
        return Err(GraphError::ArityMismatch {
            expected,
            actual: inputs.len(),
            operation: operation.to_string(),
        });
    }
    Ok(())
}

/// Returns the common batch length of `inputs`.
pub(crate) fn batch_len(inputs: &[ResultRef], operation: &str) -> Result<usize, GraphError> {
    let first = inputs.first().map(|r| r.batch_len()).ok_or(GraphError::ArityMismatch {
        expected: 1,
        actual: 0,
        operation: operation.to_string(),
    })?;
    if let Some(bad) = inputs.iter().find(|r| r.batch_len() != first) {
        return Err(GraphError::BatchMismatch {
            expected: first,
            actual: bad.batch_len(),
            operation: operation.to_string(),
        });
    }
    if first == 0 {
        return Err(GraphError::EmptyBatch);
    }
    Ok(first)
}
