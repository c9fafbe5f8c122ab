use crate::autograd::backward_op::BackwardOp;
use crate::autograd::delta_set::DeltaSet;
use crate::autograd::result::{NodeResult, ResultRef};
use crate::error::GraphError;
use crate::nn::layer::{batch_len, check_arity, Layer, LayerId};
use crate::nn::parameter::Parameter;
use crate::nn::state::LayerState;
use crate::tensor::Tensor;

/// Fully connected layer without bias: `y = W x`.
///
/// `W` has shape `[output_dim, input_dim]`; every input item must hold
/// `input_dim` values (its shape is otherwise ignored) and every output item
/// has shape `[output_dim]`. Pair it with a [`Bias`](super::Bias) node for an
/// affine map.
#[derive(Debug)]
pub struct Dense {
    id: LayerId,
    name: String,
    weights: Parameter,
    input_dim: usize,
    output_dim: usize,
    frozen: bool,
}

impl Dense {
    /// Creates a new Dense layer with zero weights.
    ///
    /// # Arguments
    /// * `input_dim` - Number of values in each input item.
    /// * `output_dim` - Number of values in each output item.
    pub fn new(input_dim: usize, output_dim: usize) -> Self {
        let weights = Parameter::new(
            Tensor::zeros(&[output_dim, input_dim]),
            Some("weights".to_string()),
        );
        Dense {
            id: LayerId::next(),
            name: format!("dense_{}x{}", output_dim, input_dim),
            weights,
            input_dim,
            output_dim,
            frozen: false,
        }
    }

    /// Creates a Dense layer around an existing weight buffer. Passing a
    /// clone of another layer's parameter shares the buffer between them.
    ///
    /// # Errors
    /// Returns `GraphError::ShapeMismatch` if `weights` is not 2-D.
    pub fn with_weights(weights: Parameter) -> Result<Self, GraphError> {
        let shape = weights.shape();
        if shape.len() != 2 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, 0],
                actual: shape,
                operation: "Dense::with_weights".to_string(),
            });
        }
        Ok(Dense {
            id: LayerId::next(),
            name: format!("dense_{}x{}", shape[0], shape[1]),
            weights,
            input_dim: shape[1],
            output_dim: shape[0],
            frozen: false,
        })
    }

    pub(crate) fn restore(
        id: LayerId,
        name: String,
        weights: Parameter,
        frozen: bool,
    ) -> Result<Self, GraphError> {
        LayerId::reserve(id);
        let mut layer = Self::with_weights(weights)?;
        layer.id = id;
        layer.name = name;
        layer.frozen = frozen;
        Ok(layer)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn weights(&self) -> &Parameter {
        &self.weights
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }
}

fn matvec(w: &[f64], x: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    (0..rows)
        .map(|r| w[r * cols..(r + 1) * cols].iter().zip(x).map(|(a, b)| a * b).sum())
        .collect()
}

impl Layer for Dense {
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
        let weights = self.weights.value();

        let mut outputs = Vec::with_capacity(input.batch_len());
        for item in input.data() {
            if item.numel() != self.input_dim {
                return Err(GraphError::ShapeMismatch {
                    expected: vec![self.input_dim],
                    actual: item.shape().to_vec(),
                    operation: self.name.clone(),
                });
            }
            let y = matvec(weights.data(), item.data(), self.output_dim, self.input_dim);
            outputs.push(Tensor::vector(y));
        }

        let backward = DenseBackward {
            layer: self.id,
            weights: self.weights.clone(),
            weight_values: weights,
            frozen: self.frozen,
            input: input.clone(),
            input_dim: self.input_dim,
            output_dim: self.output_dim,
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
        vec![self.weights.clone()]
    }

    fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    fn to_state(&self) -> LayerState {
        LayerState::Dense {
            id: self.id,
            name: self.name.clone(),
            weights: self.weights.to_state(),
            frozen: self.frozen,
        }
    }
}

/// Backward of `y = W x`: `dW += g xᵀ` (summed over items) and `dx = Wᵀ g`.
///
/// Holds the weight values read during the forward pass so the gradient is
/// taken at the point that was evaluated.
#[derive(Debug)]
struct DenseBackward {
    layer: LayerId,
    weights: Parameter,
    weight_values: Tensor,
    frozen: bool,
    input: ResultRef,
    input_dim: usize,
    output_dim: usize,
}

impl BackwardOp for DenseBackward {
    fn backward(&self, deltas: &mut DeltaSet, grad_output: &[Tensor]) -> Result<(), GraphError> {
        let w = self.weight_values.data();

        if !self.frozen {
            let mut grad_w = Tensor::zeros(&[self.output_dim, self.input_dim]);
            let gw = grad_w.data_mut();
            for (g, x) in grad_output.iter().zip(self.input.data()) {
                for (r, gr) in g.data().iter().enumerate() {
                    for (c, xc) in x.data().iter().enumerate() {
                        gw[r * self.input_dim + c] += gr * xc;
                    }
                }
            }
            deltas.accumulate(self.layer, &self.weights, &grad_w)?;
        }

        if self.input.is_alive() {
            let mut grad_inputs = Vec::with_capacity(grad_output.len());
            for (g, x) in grad_output.iter().zip(self.input.data()) {
                let mut dx = vec![0.0; self.input_dim];
                for (r, gr) in g.data().iter().enumerate() {
                    for (c, d) in dx.iter_mut().enumerate() {
                        *d += w[r * self.input_dim + c] * gr;
                    }
                }
                grad_inputs.push(Tensor::new(dx, x.shape().to_vec())?);
            }
            self.input.backward(deltas, &grad_inputs)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dense_test.rs"]
mod tests;
