use crate::autograd::backward_op::BackwardOp;
use crate::autograd::delta_set::DeltaSet;
use crate::autograd::result::{NodeResult, ResultRef};
use crate::error::GraphError;
use crate::nn::layer::Layer;
use crate::tensor::Tensor;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Error type specifically for gradient checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Gradient check failed for {target}, element index {element_index}: Analytical grad {analytical_grad:?} != Numerical grad {numerical_grad:?}. Difference: {difference:?}")]
    GradientMismatch {
        target: String,
        element_index: usize,
        analytical_grad: f64,
        numerical_grad: f64,
        difference: f64,
    },
    #[error("Forward evaluation failed during gradient check: {0}")]
    ForwardPassError(GraphError),
    #[error("Backward pass failed during gradient check: {0}")]
    BackwardPassError(GraphError),
    #[error("Error during intermediate calculation: {0}")]
    GraphError(#[from] GraphError),
    #[error("{target} should receive a gradient but has none after backward pass.")]
    MissingAnalyticalGrad { target: String },
    #[error("Numerical gradient is NaN or infinite for {target}, element {element_index}. Details: Loss+: {loss_plus:?}, Loss-: {loss_minus:?}")]
    NumericalGradNaNOrInfinite {
        target: String,
        element_index: usize,
        loss_plus: f64,
        loss_minus: f64,
    },
    #[error("Analytical gradient is NaN or infinite for {target}, element {element_index}. Value: {value:?}")]
    AnalyticalGradNaNOrInfinite {
        target: String,
        element_index: usize,
        value: f64,
    },
    #[error("Gradient check needs a non-empty batch with one tensor per layer input.")]
    InvalidBatch,
}

/// Records the gradient delivered to an input leaf.
#[derive(Debug)]
struct CaptureBackward {
    captured: Arc<Mutex<Option<Vec<Tensor>>>>,
}

impl BackwardOp for CaptureBackward {
    fn backward(&self, _deltas: &mut DeltaSet, grad_output: &[Tensor]) -> Result<(), GraphError> {
        let mut slot = self
            .captured
            .lock()
            .map_err(|_| GraphError::LockError("gradient capture".to_string()))?;
        *slot = Some(grad_output.to_vec());
        Ok(())
    }
}

type Captured = Arc<Mutex<Option<Vec<Tensor>>>>;

/// Splits a batch of rows into one live, capturing leaf per input index.
fn capture_leaves(batch: &[Vec<Tensor>]) -> Result<(Vec<ResultRef>, Vec<Captured>), GradCheckError> {
    let arity = batch.first().map(Vec::len).ok_or(GradCheckError::InvalidBatch)?;
    if batch.iter().any(|row| row.len() != arity) {
        return Err(GradCheckError::InvalidBatch);
    }
    let mut leaves = Vec::with_capacity(arity);
    let mut slots = Vec::with_capacity(arity);
    for index in 0..arity {
        let captured: Captured = Arc::new(Mutex::new(None));
        let column = batch.iter().map(|row| row[index].clone()).collect();
        leaves.push(NodeResult::leaf(
            format!("input_{}", index),
            column,
            true,
            Box::new(CaptureBackward {
                captured: captured.clone(),
            }),
        )?);
        slots.push(captured);
    }
    Ok((leaves, slots))
}

/// Deterministic, non-uniform output weights so that transposed or
/// permuted gradients do not cancel out.
fn output_weights(output: &[Tensor]) -> Vec<Tensor> {
    output
        .iter()
        .map(|t| {
            let mut w = Tensor::zeros(t.shape());
            for (k, v) in w.data_mut().iter_mut().enumerate() {
                *v = 1.0 + 0.25 * (k % 4) as f64;
            }
            w
        })
        .collect()
}

fn weighted_loss(layer: &dyn Layer, batch: &[Vec<Tensor>], weights: &[Tensor]) -> Result<f64, GradCheckError> {
    let arity = batch.first().map(Vec::len).ok_or(GradCheckError::InvalidBatch)?;
    let inputs = (0..arity)
        .map(|index| NodeResult::constant(batch.iter().map(|row| row[index].clone()).collect()))
        .collect::<Result<Vec<_>, _>>()?;
    let output = layer.eval(&inputs).map_err(GradCheckError::ForwardPassError)?;
    let mut loss = 0.0;
    for (o, w) in output.data().iter().zip(weights) {
        loss += o.dot(w)?;
    }
    Ok(loss)
}

fn compare(
    target: &str,
    element_index: usize,
    analytical_grad: f64,
    loss_plus: f64,
    loss_minus: f64,
    epsilon: f64,
    abs_tolerance: f64,
    rel_tolerance: f64,
) -> Result<(), GradCheckError> {
    let numerical_grad = (loss_plus - loss_minus) / (2.0 * epsilon);
    if !numerical_grad.is_finite() {
        return Err(GradCheckError::NumericalGradNaNOrInfinite {
            target: target.to_string(),
            element_index,
            loss_plus,
            loss_minus,
        });
    }
    if !analytical_grad.is_finite() {
        return Err(GradCheckError::AnalyticalGradNaNOrInfinite {
            target: target.to_string(),
            element_index,
            value: analytical_grad,
        });
    }
    let difference = (analytical_grad - numerical_grad).abs();
    if difference > abs_tolerance && difference / (analytical_grad.abs() + epsilon) > rel_tolerance {
        return Err(GradCheckError::GradientMismatch {
            target: target.to_string(),
            element_index,
            analytical_grad,
            numerical_grad,
            difference,
        });
    }
    Ok(())
}

/// Checks a layer's analytical gradients against central finite differences.
///
/// The scalar objective is a fixed weighted sum of the layer's outputs. Every
/// input is fed as a live leaf that records the gradient reaching it, and
/// every non-frozen parameter is compared through the [`DeltaSet`] the
/// backward pass fills.
///
/// # Arguments
/// * `layer`: The layer under test. Its parameters are perturbed in place and
///    restored before returning.
/// * `batch`: Rows of inputs, one tensor per layer input per row.
/// * `epsilon`: Finite-difference step.
/// * `abs_tolerance` / `rel_tolerance`: A mismatch is reported only when
///    both the absolute and relative differences exceed their tolerance.
pub fn check_layer(
    layer: &dyn Layer,
    batch: &[Vec<Tensor>],
    epsilon: f64,
    abs_tolerance: f64,
    rel_tolerance: f64,
) -> Result<(), GradCheckError> {
    // --- Analytical pass ---
    let (leaves, slots) = capture_leaves(batch)?;
    let output = layer.eval(&leaves).map_err(GradCheckError::ForwardPassError)?;
    let weights = output_weights(output.data());
    let mut deltas = DeltaSet::new();
    output
        .backward(&mut deltas, &weights)
        .map_err(GradCheckError::BackwardPassError)?;
    validate_finite(&deltas)?;

    // --- Inputs ---
    for (index, slot) in slots.iter().enumerate() {
        let target = format!("input {}", index);
        let analytical = slot
            .lock()
            .map_err(|_| GraphError::LockError("gradient capture".to_string()))?
            .clone()
            .ok_or_else(|| GradCheckError::MissingAnalyticalGrad {
                target: target.clone(),
            })?;
        for (item, grad) in analytical.iter().enumerate() {
            let numel = batch[item][index].numel();
            for elem in 0..numel {
                let mut plus = batch.to_vec();
                plus[item][index].data_mut()[elem] += epsilon;
                let mut minus = batch.to_vec();
                minus[item][index].data_mut()[elem] -= epsilon;
                let loss_plus = weighted_loss(layer, &plus, &weights)?;
                let loss_minus = weighted_loss(layer, &minus, &weights)?;
                compare(
                    &format!("{} item {}", target, item),
                    elem,
                    grad.data()[elem],
                    loss_plus,
                    loss_minus,
                    epsilon,
                    abs_tolerance,
                    rel_tolerance,
                )?;
            }
        }
    }

    // --- Parameters ---
    if layer.is_frozen() {
        return Ok(());
    }
    for param in layer.parameters() {
        let target = format!("parameter {}", param.id());
        let analytical = deltas
            .get_delta(param.id())
            .map(|d| d.delta().clone())
            .ok_or_else(|| GradCheckError::MissingAnalyticalGrad {
                target: target.clone(),
            })?;
        let original = param.value();
        for elem in 0..original.numel() {
            let mut plus = original.clone();
            plus.data_mut()[elem] += epsilon;
            param.set_value(plus)?;
            let loss_plus = weighted_loss(layer, batch, &weights);

            let mut minus = original.clone();
            minus.data_mut()[elem] -= epsilon;
            param.set_value(minus)?;
            let loss_minus = weighted_loss(layer, batch, &weights);

            param.set_value(original.clone())?;
            compare(
                &target,
                elem,
                analytical.data()[elem],
                loss_plus?,
                loss_minus?,
                epsilon,
                abs_tolerance,
                rel_tolerance,
            )?;
        }
    }
    Ok(())
}

/// Fails if any accumulated gradient is NaN or infinite.
pub fn validate_finite(deltas: &DeltaSet) -> Result<(), GradCheckError> {
    for (id, delta) in deltas.iter() {
        if let Some((element_index, &value)) = delta
            .delta()
            .data()
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(GradCheckError::AnalyticalGradNaNOrInfinite {
                target: format!("parameter {}", id),
                element_index,
                value,
            });
        }
    }
    Ok(())
}
