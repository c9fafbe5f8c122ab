use deltagraph_core::nn::layers::Dense;
use deltagraph_core::{NodeResult, Parameter, ResultRef, Tensor};
use once_cell::sync::OnceCell;

static LOGGER: OnceCell<()> = OnceCell::new();

/// Initializes env_logger once per test binary. Respects `RUST_LOG`.
#[allow(dead_code)]
pub fn init_logger() {
    LOGGER.get_or_init(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// A `[rows, cols]` Dense layer with the given weights.
#[allow(dead_code)]
pub fn dense(weights: Vec<f64>, rows: usize, cols: usize) -> Dense {
    let param = Parameter::new_unnamed(Tensor::new(weights, vec![rows, cols]).expect("weights"));
    Dense::with_weights(param).expect("dense")
}

/// Wraps one tensor per batch item as a constant input.
#[allow(dead_code)]
pub fn constant(items: &[Vec<f64>]) -> ResultRef {
    NodeResult::constant(items.iter().map(|v| Tensor::vector(v.clone())).collect()).expect("constant")
}

/// Ones with the shape of every item of `result`.
#[allow(dead_code)]
pub fn ones_like(result: &ResultRef) -> Vec<Tensor> {
    result.data().iter().map(|t| Tensor::full(t.shape(), 1.0)).collect()
}
