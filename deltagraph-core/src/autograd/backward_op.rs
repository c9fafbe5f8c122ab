// Define the BackwardOp trait here

use crate::autograd::delta_set::DeltaSet;
use crate::error::GraphError;
use crate::tensor::Tensor;
use std::fmt::Debug;

/// Defines the interface for the deferred backward half of one layer evaluation.
///
/// Every [`NodeResult`](crate::autograd::NodeResult) produced by a layer owns
/// exactly one `BackwardOp`. It is a small owned object holding only what the
/// gradient computation needs: handles to the input results it consumed, the
/// parameter buffers it read, and whether those parameters are frozen. The
/// result invokes it at most once per backward pass, after every registered
/// consumer has delivered its share of the output gradient.
///
/// The trait requires `Debug + Send + Sync` because results may be shared
/// between worker threads evaluating different partitions of a batch.
pub trait BackwardOp: Debug + Send + Sync {
    /// Consumes the output gradient of the operation.
    ///
    /// Implementations must:
    /// 1. if the layer is not frozen, compute each owned parameter's gradient
    ///    contribution and add it to `deltas` (never overwrite);
    /// 2. for every input that is alive, compute that input's gradient and
    ///    call its [`NodeResult::backward`](crate::autograd::NodeResult::backward).
    ///    Dead inputs must be skipped entirely.
    ///
    /// # Arguments
    /// * `deltas`: The accumulator for the current partition's backward pass.
    /// * `grad_output`: One gradient tensor per batch item, each with the
    ///    shape of the corresponding output tensor.
    ///
    /// # Errors
    /// Propagates shape errors from accumulation and any error raised by an
    /// input's backward.
    fn backward(&self, deltas: &mut DeltaSet, grad_output: &[Tensor]) -> Result<(), GraphError>;
}

/// Backward of a leaf result: nothing upstream, nothing to accumulate.
#[derive(Debug, Default)]
pub struct LeafBackward;

impl BackwardOp for LeafBackward {
    fn backward(&self, _deltas: &mut DeltaSet, _grad_output: &[Tensor]) -> Result<(), GraphError> {
        Ok(())
    }
}
