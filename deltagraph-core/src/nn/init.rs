use crate::error::GraphError;
use crate::nn::parameter::Parameter;
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, Uniform};

/// Fills the parameter with the scalar value 0.
pub fn zeros_(param: &Parameter) -> Result<(), GraphError> {
    fill_(param, 0.0)
}

/// Fills the parameter with `value`.
pub fn fill_(param: &Parameter, value: f64) -> Result<(), GraphError> {
    param.set_value(Tensor::full(&param.shape(), value))
}

/// Fills the parameter with samples from `N(mean, std²)`.
///
/// Seeded so that two networks built with the same seed start from the same
/// point.
///
/// # Errors
/// Returns `GraphError::InternalError` if `std` is negative or not finite.
pub fn normal_(param: &Parameter, mean: f64, std: f64, seed: u64) -> Result<(), GraphError> {
    let dist = Normal::new(mean, std)
        .map_err(|e| GraphError::InternalError(format!("invalid normal init: {}", e)))?;
    let mut rng = StdRng::seed_from_u64(seed);
    sample_into(param, |_| dist.sample(&mut rng))
}

/// Fills the parameter with samples from `U[low, high)`.
pub fn uniform_(param: &Parameter, low: f64, high: f64, seed: u64) -> Result<(), GraphError> {
    if !(low < high) {
        return Err(GraphError::InternalError(format!(
            "invalid uniform init range [{}, {})",
            low, high
        )));
    }
    let dist = Uniform::new(low, high);
    let mut rng = StdRng::seed_from_u64(seed);
    sample_into(param, |_| dist.sample(&mut rng))
}

/// Xavier/Glorot uniform initialization for a `[fan_out, fan_in]` weight.
pub fn xavier_uniform_(param: &Parameter, seed: u64) -> Result<(), GraphError> {
    let shape = param.shape();
    let (fan_out, fan_in) = match shape.as_slice() {
        [out, inp] => (*out, *inp),
        _ => {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, 0],
                actual: shape,
                operation: "xavier_uniform_".to_string(),
            })
        }
    };
    let bound = (6.0 / (fan_in + fan_out).max(1) as f64).sqrt();
    uniform_(param, -bound, bound, seed)
}

fn sample_into(param: &Parameter, mut sample: impl FnMut(usize) -> f64) -> Result<(), GraphError> {
    let shape = param.shape();
    let numel = shape.iter().product();
    let data = (0..numel).map(&mut sample).collect();
    param.set_value(Tensor::new(data, shape)?)
}

#[cfg(test)]
#[path = "init_test.rs"]
mod tests;
