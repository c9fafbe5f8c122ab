// deltagraph-core/src/autograd/result.rs

use crate::autograd::backward_op::{BackwardOp, LeafBackward};
use crate::autograd::delta_set::DeltaSet;
use crate::error::{GraphError, Stage};
use crate::tensor::Tensor;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to a [`NodeResult`]. Consumers hold one per attached input.
pub type ResultRef = Arc<NodeResult>;

struct Pending {
    received: usize,
    grad: Option<Vec<Tensor>>,
    op: Option<Box<dyn BackwardOp>>,
}

/// The output of one forward evaluation of a node, paired with its deferred
/// backward operation.
///
/// A `NodeResult` holds one tensor per batch item, a liveness flag fixed at
/// construction, and a consumer count. Every consumer that captures this
/// result while alive is attached (the count is incremented); during the
/// backward pass each consumer delivers its gradient through
/// [`NodeResult::backward`]. Deliveries are summed, and the wrapped
/// [`BackwardOp`] fires exactly once, when the last registered consumer has
/// delivered. Firing drops the op, which releases this result's references to
/// its own inputs.
///
/// A result nobody attached to (the root of an evaluation) fires on its first
/// delivery.
pub struct NodeResult {
    operation: String,
    data: Vec<Tensor>,
    alive: bool,
    consumers: AtomicUsize,
    pending: Mutex<Pending>,
}

impl NodeResult {
    /// Creates the result of a layer evaluation and attaches it to its live inputs.
    ///
    /// Liveness follows the graph rule: the result is alive iff the layer has
    /// a non-frozen parameter (`trainable`) or at least one input is alive.
    ///
    /// # Errors
    /// Returns `GraphError::NonFinite` if any output value is NaN or infinite.
    pub fn new(
        operation: impl Into<String>,
        data: Vec<Tensor>,
        inputs: &[ResultRef],
        trainable: bool,
        op: Box<dyn BackwardOp>,
    ) -> Result<ResultRef, GraphError> {
        let operation = operation.into();
        if !data.iter().all(Tensor::is_finite) {
            return Err(GraphError::NonFinite {
                operation,
                stage: Stage::Forward,
            });
        }
        let alive = Self::liveness(trainable, inputs);
        if alive {
            for input in inputs.iter().filter(|i| i.is_alive()) {
                input.attach();
            }
        }
        Ok(Arc::new(NodeResult {
            operation,
            data,
            alive,
            consumers: AtomicUsize::new(0),
            pending: Mutex::new(Pending {
                received: 0,
                grad: None,
                op: Some(op),
            }),
        }))
    }

    /// A dead leaf: a value no gradient will ever flow into.
    pub fn constant(data: Vec<Tensor>) -> Result<ResultRef, GraphError> {
        Self::leaf("constant", data, false, Box::new(LeafBackward))
    }

    /// A live leaf whose backward discards its gradient. Used when liveness
    /// pruning is disabled so every path is traversed.
    pub fn input(data: Vec<Tensor>) -> Result<ResultRef, GraphError> {
        Self::leaf("input", data, true, Box::new(LeafBackward))
    }

    /// A leaf with an explicit liveness flag and backward op. Gradient
    /// checking uses this to capture the gradient reaching an input.
    pub fn leaf(
        operation: impl Into<String>,
        data: Vec<Tensor>,
        alive: bool,
        op: Box<dyn BackwardOp>,
    ) -> Result<ResultRef, GraphError> {
        let result = Self::new(operation, data, &[], alive, op)?;
        Ok(result)
    }

    /// Liveness rule shared by every layer.
    pub fn liveness(trainable: bool, inputs: &[ResultRef]) -> bool {
        trainable || inputs.iter().any(|i| i.is_alive())
    }

    /// Registers one more consumer that will deliver a gradient.
    pub fn attach(&self) {
        self.consumers.fetch_add(1, Ordering::AcqRel);
    }

    pub fn consumers(&self) -> usize {
        self.consumers.load(Ordering::Acquire)
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// The output tensors, one per batch item.
    pub fn data(&self) -> &[Tensor] {
        &self.data
    }

    pub fn batch_len(&self) -> usize {
        self.data.len()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    fn lock_pending(&self) -> Result<MutexGuard<'_, Pending>, GraphError> {
        self.pending
            .lock()
            .map_err(|_| GraphError::LockError(format!("pending gradient of {}", self.operation)))
    }

    /// Delivers one consumer's gradient for this result.
    ///
    /// A no-op on a dead result. Otherwise the gradient is validated (one
    /// finite tensor per item, matching output shapes) and summed into the
    /// pending buffer; once every attached consumer has delivered, the
    /// backward op fires with the total.
    ///
    /// # Errors
    /// * `GraphError::BatchMismatch` / `ShapeMismatch` for malformed gradients.
    /// * `GraphError::NonFinite` for NaN or infinite gradients.
    /// * `GraphError::BackwardConsumed` if the op already fired this pass.
    pub fn backward(&self, deltas: &mut DeltaSet, grad: &[Tensor]) -> Result<(), GraphError> {
        if !self.alive {
            return Ok(());
        }
        if grad.len() != self.data.len() {
            return Err(GraphError::BatchMismatch {
                expected: self.data.len(),
                actual: grad.len(),
                operation: self.operation.clone(),
            });
        }
        for (g, d) in grad.iter().zip(self.data.iter()) {
            d.check_same_shape(g, &self.operation)?;
            if !g.is_finite() {
                return Err(GraphError::NonFinite {
                    operation: self.operation.clone(),
                    stage: Stage::Backward,
                });
            }
        }

        let (op, total) = {
            let mut pending = self.lock_pending()?;
            if pending.op.is_none() {
                return Err(GraphError::BackwardConsumed {
                    operation: self.operation.clone(),
                });
            }
            match pending.grad.as_mut() {
                Some(acc) => {
                    for (a, g) in acc.iter_mut().zip(grad.iter()) {
                        a.add_assign(g)?;
                    }
                }
                None => pending.grad = Some(grad.to_vec()),
            }
            pending.received += 1;
            let expected = self.consumers().max(1);
            if pending.received < expected {
                return Ok(());
            }
            let op = pending.op.take();
            let total = pending.grad.take();
            (op, total)
        };

        match (op, total) {
            (Some(op), Some(total)) => {
                log::trace!("backward firing for {}", self.operation);
                op.backward(deltas, &total)
            }
            _ => Err(GraphError::InternalError(format!(
                "pending state of {} lost during backward",
                self.operation
            ))),
        }
    }
}

impl fmt::Debug for NodeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeResult")
            .field("operation", &self.operation)
            .field("batch_len", &self.data.len())
            .field("alive", &self.alive)
            .field("consumers", &self.consumers())
            .finish()
    }
}
