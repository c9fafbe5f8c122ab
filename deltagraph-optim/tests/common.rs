use deltagraph_core::nn::layers::{Bias, Dense};
use deltagraph_core::nn::losses::SquareError;
use deltagraph_core::nn::init;
use deltagraph_core::utils::testing::regression_rows;
use deltagraph_core::{BasicTrainable, DagNetwork, Edge, Parameter, Tensor};
use once_cell::sync::OnceCell;
use std::sync::Arc;

static LOGGER: OnceCell<()> = OnceCell::new();

/// Initializes env_logger once per test binary. Respects `RUST_LOG`.
#[allow(dead_code)]
pub fn init_logger() {
    LOGGER.get_or_init(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// `Dense(w) -> SquareError` on one `(x, y)` pair.
#[allow(dead_code)]
pub fn scalar_regression(w: f64, x: f64, y: f64) -> (Parameter, BasicTrainable) {
    let weight = Parameter::new(Tensor::new(vec![w], vec![1, 1]).expect("1x1"), Some("w".to_string()));
    let mut net = DagNetwork::new("scalar_regression", 2);
    let dense = net
        .add_layer(Dense::with_weights(weight.clone()).expect("matrix"), &[Edge::Input(0)])
        .expect("dense");
    net.add_layer(SquareError::new(), &[Edge::Node(dense), Edge::Input(1)])
        .expect("loss");
    let rows = regression_rows(&[(vec![x], vec![y])]);
    (weight, BasicTrainable::new(Arc::new(net), rows))
}

/// `y = A x + b` with a known `A` and `b`, fitted by `Dense -> Bias`.
#[allow(dead_code)]
pub fn linear_fit(seed: u64) -> (DagNetwork, Vec<Vec<Tensor>>) {
    let mut net = DagNetwork::new("linear_fit", 2);
    let dense = Dense::new(2, 2);
    init::normal_(dense.weights(), 0.0, 0.1, seed).expect("init");
    let d = net.add_layer(dense, &[Edge::Input(0)]).expect("dense");
    let b = net.add_layer(Bias::new(2), &[Edge::Node(d)]).expect("bias");
    net.add_layer(SquareError::new(), &[Edge::Node(b), Edge::Input(1)])
        .expect("loss");

    let a = [[1.5, -0.5], [0.25, 2.0]];
    let bias = [0.5, -1.0];
    let xs = [[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [-1.0, 2.0], [0.5, -1.5], [2.0, 0.5]];
    let pairs: Vec<(Vec<f64>, Vec<f64>)> = xs
        .iter()
        .map(|x| {
            let y = (0..2)
                .map(|r| a[r][0] * x[0] + a[r][1] * x[1] + bias[r])
                .collect();
            (x.to_vec(), y)
        })
        .collect();
    (net, regression_rows(&pairs))
}
