// deltagraph-core/src/nn/losses/square_error.rs

use crate::autograd::backward_op::BackwardOp;
use crate::autograd::delta_set::DeltaSet;
use crate::autograd::result::{NodeResult, ResultRef};
use crate::error::GraphError;
use crate::nn::layer::{batch_len, check_arity, Layer, LayerId};
use crate::nn::state::LayerState;
use crate::tensor::Tensor;

/// Sum of squared errors between a prediction and a target.
///
/// Takes two inputs, `[prediction, target]`, of matching shape and produces
/// one scalar per batch item: `Σ (p - t)²`. Averaging over the batch is left
/// to the trainable that measures the network, so a partitioned batch sums
/// exactly.
///
/// The target is usually a constant input and therefore dead; its gradient
/// (`-2 (p - t)`) is only computed when it is alive.
#[derive(Debug)]
pub struct SquareError {
    id: LayerId,
    name: String,
}

impl SquareError {
    pub fn new() -> Self {
        SquareError {
            id: LayerId::next(),
            name: "square_error".to_string(),
        }
    }

    pub(crate) fn restore(id: LayerId, name: String) -> Self {
        LayerId::reserve(id);
        SquareError { id, name }
    }
}

impl Default for SquareError {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for SquareError {
    fn id(&self) -> LayerId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn eval(&self, inputs: &[ResultRef]) -> Result<ResultRef, GraphError> {
        check_arity(inputs, 2, &self.name)?;
        batch_len(inputs, &self.name)?;
        let (prediction, target) = (&inputs[0], &inputs[1]);

        let mut residuals = Vec::with_capacity(prediction.batch_len());
        let mut outputs = Vec::with_capacity(prediction.batch_len());
        for (p, t) in prediction.data().iter().zip(target.data()) {
            let r = p.zip_map(t, &self.name, |p, t| p - t)?;
            outputs.push(Tensor::scalar(r.sum_sq()));
            residuals.push(r);
        }

        NodeResult::new(
            self.name.clone(),
            outputs,
            inputs,
            false,
            Box::new(SquareErrorBackward {
                prediction: prediction.clone(),
                target: target.clone(),
                residuals,
            }),
        )
    }

    fn is_frozen(&self) -> bool {
        true
    }

    fn set_frozen(&mut self, _frozen: bool) {}

    fn to_state(&self) -> LayerState {
        LayerState::SquareError {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

#[derive(Debug)]
struct SquareErrorBackward {
    prediction: ResultRef,
    target: ResultRef,
    residuals: Vec<Tensor>,
}

impl SquareErrorBackward {
    fn scaled(&self, grad_output: &[Tensor], sign: f64) -> Result<Vec<Tensor>, GraphError> {
        grad_output
            .iter()
            .zip(&self.residuals)
            .map(|(g, r)| Ok(r.scale(2.0 * sign * g.item()?)))
            .collect()
    }
}

impl BackwardOp for SquareErrorBackward {
    fn backward(&self, deltas: &mut DeltaSet, grad_output: &[Tensor]) -> Result<(), GraphError> {
        if self.prediction.is_alive() {
            let grads = self.scaled(grad_output, 1.0)?;
            self.prediction.backward(deltas, &grads)?;
        }
        if self.target.is_alive() {
            let grads = self.scaled(grad_output, -1.0)?;
            self.target.backward(deltas, &grads)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "square_error_test.rs"]
mod tests;
