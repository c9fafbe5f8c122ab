use crate::autograd::backward_op::BackwardOp;
use crate::autograd::delta_set::DeltaSet;
use crate::autograd::result::{NodeResult, ResultRef};
use crate::error::GraphError;
use crate::nn::layer::{batch_len, check_arity, Layer, LayerId};
use crate::nn::state::LayerState;
use crate::tensor::Tensor;

/// Layer that applies the Rectified Linear Unit (ReLU) activation function.
///
/// This layer does not have any learnable parameters; its output is alive
/// only when its input is.
#[derive(Debug)]
pub struct Relu {
    id: LayerId,
    name: String,
}

impl Relu {
    pub fn new() -> Self {
        Relu {
            id: LayerId::next(),
            name: "relu".to_string(),
        }
    }

    pub(crate) fn restore(id: LayerId, name: String) -> Self {
        LayerId::reserve(id);
        Relu { id, name }
    }
}

impl Default for Relu {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for Relu {
    fn id(&self) -> LayerId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn eval(&self, inputs: &[ResultRef]) -> Result<ResultRef, GraphError> {
        check_arity(inputs, 1, &self.name)?;
        batch_len(inputs, &self.name)?;
        let input = &inputs[0];
        let outputs = input.data().iter().map(|t| t.map(|x| x.max(0.0))).collect();
        NodeResult::new(
            self.name.clone(),
            outputs,
            inputs,
            false,
            Box::new(ReluBackward {
                input: input.clone(),
            }),
        )
    }

    fn is_frozen(&self) -> bool {
        true
    }

    fn set_frozen(&mut self, _frozen: bool) {}

    fn to_state(&self) -> LayerState {
        LayerState::Relu {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

#[derive(Debug)]
struct ReluBackward {
    input: ResultRef,
}

impl BackwardOp for ReluBackward {
    fn backward(&self, deltas: &mut DeltaSet, grad_output: &[Tensor]) -> Result<(), GraphError> {
        if !self.input.is_alive() {
            return Ok(());
        }
        let grads = grad_output
            .iter()
            .zip(self.input.data())
            .map(|(g, x)| g.zip_map(x, "relu_backward", |g, x| if x > 0.0 { g } else { 0.0 }))
            .collect::<Result<Vec<_>, _>>()?;
        self.input.backward(deltas, &grads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relu_forward_and_mask() -> Result<(), GraphError> {
        let relu = Relu::new();
        let input = NodeResult::input(vec![Tensor::vector(vec![-1.0, 0.0, 2.0])])?;
        let out = relu.eval(&[input])?;
        assert_eq!(out.data()[0].data(), &[0.0, 0.0, 2.0]);
        assert!(out.is_alive());
        out.backward(&mut DeltaSet::new(), &[Tensor::vector(vec![1.0, 1.0, 1.0])])?;
        Ok(())
    }

    #[test]
    fn test_relu_over_constant_is_dead() -> Result<(), GraphError> {
        let relu = Relu::new();
        let out = relu.eval(&[NodeResult::constant(vec![Tensor::scalar(1.0)])?])?;
        assert!(!out.is_alive());
        assert!(relu.parameters().is_empty());
        Ok(())
    }
}
