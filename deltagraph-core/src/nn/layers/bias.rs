use crate::autograd::backward_op::BackwardOp;
use crate::autograd::delta_set::DeltaSet;
use crate::autograd::result::{NodeResult, ResultRef};
use crate::error::GraphError;
use crate::nn::layer::{batch_len, check_arity, Layer, LayerId};
use crate::nn::parameter::Parameter;
use crate::nn::state::LayerState;
use crate::tensor::Tensor;

/// Adds a learned offset to every item: `y = x + b`.
#[derive(Debug)]
pub struct Bias {
    id: LayerId,
    name: String,
    bias: Parameter,
    frozen: bool,
}

impl Bias {
    /// Creates a zero bias of `dim` values.
    pub fn new(dim: usize) -> Self {
        Self::with_bias(Parameter::new(Tensor::zeros(&[dim]), Some("bias".to_string())))
    }

    pub fn with_bias(bias: Parameter) -> Self {
        Bias {
            id: LayerId::next(),
            name: format!("bias_{}", bias.numel()),
            bias,
            frozen: false,
        }
    }

    pub(crate) fn restore(id: LayerId, name: String, bias: Parameter, frozen: bool) -> Self {
        LayerId::reserve(id);
        Bias {
            id,
            name,
            bias,
            frozen,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn bias(&self) -> &Parameter {
        &self.bias
    }
}

impl Layer for Bias {
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
        let bias = self.bias.value();

        let mut outputs = Vec::with_capacity(input.batch_len());
        for item in input.data() {
            if item.numel() != bias.numel() {
                return Err(GraphError::ShapeMismatch {
                    expected: bias.shape().to_vec(),
                    actual: item.shape().to_vec(),
                    operation: self.name.clone(),
                });
            }
            let data = item.data().iter().zip(bias.data()).map(|(x, b)| x + b).collect();
            outputs.push(Tensor::new(data, item.shape().to_vec())?);
        }

        let backward = BiasBackward {
            layer: self.id,
            bias: self.bias.clone(),
            frozen: self.frozen,
            input: input.clone(),
        };
        NodeResult::new(
            self.name.clone(),
            outputs,
            inputs,
            self.is_trainable(),
            Box::new(backward),
        )
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![self.bias.clone()]
    }

    fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    fn to_state(&self) -> LayerState {
        LayerState::Bias {
            id: self.id,
            name: self.name.clone(),
            bias: self.bias.to_state(),
            frozen: self.frozen,
        }
    }
}

#[derive(Debug)]
struct BiasBackward {
    layer: LayerId,
    bias: Parameter,
    frozen: bool,
    input: ResultRef,
}

impl BackwardOp for BiasBackward {
    fn backward(&self, deltas: &mut DeltaSet, grad_output: &[Tensor]) -> Result<(), GraphError> {
        if !self.frozen {
            let shape = self.bias.shape();
            let mut total = Tensor::zeros(&shape);
            for g in grad_output {
                total.add_assign(&Tensor::new(g.data().to_vec(), shape.clone())?)?;
            }
            deltas.accumulate(self.layer, &self.bias, &total)?;
        }
        if self.input.is_alive() {
            self.input.backward(deltas, grad_output)?;
        }
        Ok(())
    }
}
