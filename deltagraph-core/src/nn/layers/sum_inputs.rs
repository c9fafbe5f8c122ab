use crate::autograd::backward_op::BackwardOp;
use crate::autograd::delta_set::DeltaSet;
use crate::autograd::result::{NodeResult, ResultRef};
use crate::error::GraphError;
use crate::nn::layer::{batch_len, check_arity, Layer, LayerId};
use crate::nn::state::LayerState;
use crate::tensor::Tensor;

/// Elementwise sum of `arity` same-shaped inputs. Used to join branches.
#[derive(Debug)]
pub struct SumInputs {
    id: LayerId,
    name: String,
    arity: usize,
}

impl SumInputs {
    pub fn new(arity: usize) -> Self {
        SumInputs {
            id: LayerId::next(),
            name: format!("sum_{}", arity),
            arity,
        }
    }

    pub(crate) fn restore(id: LayerId, name: String, arity: usize) -> Self {
        LayerId::reserve(id);
        SumInputs { id, name, arity }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl Layer for SumInputs {
    fn id(&self) -> LayerId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn eval(&self, inputs: &[ResultRef]) -> Result<ResultRef, GraphError> {
        check_arity(inputs, self.arity, &self.name)?;
        let n = batch_len(inputs, &self.name)?;
        let mut outputs = Vec::with_capacity(n);
        for item in 0..n {
            let mut total = inputs[0].data()[item].clone();
            for input in &inputs[1..] {
                total = total.zip_map(&input.data()[item], &self.name, |a, b| a + b)?;
            }
            outputs.push(total);
        }
        NodeResult::new(
            self.name.clone(),
            outputs,
            inputs,
            false,
            Box::new(SumBackward {
                inputs: inputs.to_vec(),
            }),
        )
    }

    fn is_frozen(&self) -> bool {
        true
    }

    fn set_frozen(&mut self, _frozen: bool) {}

    fn to_state(&self) -> LayerState {
        LayerState::SumInputs {
            id: self.id,
            name: self.name.clone(),
            arity: self.arity,
        }
    }
}

#[derive(Debug)]
struct SumBackward {
    inputs: Vec<ResultRef>,
}

impl BackwardOp for SumBackward {
    fn backward(&self, deltas: &mut DeltaSet, grad_output: &[Tensor]) -> Result<(), GraphError> {
        // the same result may appear twice; it was attached once per edge
        for input in self.inputs.iter().filter(|i| i.is_alive()) {
            input.backward(deltas, grad_output)?;
        }
        Ok(())
    }
}
