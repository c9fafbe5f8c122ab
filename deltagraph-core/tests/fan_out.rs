use approx::assert_abs_diff_eq;
use deltagraph_core::nn::layers::{Dense, SumInputs};
use deltagraph_core::nn::losses::SquareError;
use deltagraph_core::utils::testing::regression_rows;
use deltagraph_core::{DagNetwork, DeltaSet, Edge, GraphError, Layer, Parameter, Tensor};

mod common;
use common::{constant, init_logger, ones_like};

/// Gradient of one path `Dense(w) -> SquareError` evaluated on its own.
fn single_path_gradient(w: &Parameter, x: f64, y: f64) -> Result<f64, GraphError> {
    let dense = Dense::with_weights(w.clone())?;
    let pred = dense.eval(&[constant(&[vec![x]])])?;
    let loss = SquareError::new().eval(&[pred, constant(&[vec![y]])])?;
    let mut deltas = DeltaSet::new();
    loss.backward(&mut deltas, &ones_like(&loss))?;
    Ok(deltas.get_delta(w.id()).map(|d| d.delta().data()[0]).unwrap_or(0.0))
}

#[test]
fn test_shared_buffer_gradient_is_sum_of_paths() -> Result<(), GraphError> {
    init_logger();
    let shared = Parameter::new(Tensor::new(vec![0.5], vec![1, 1])?, Some("shared".to_string()));

    // loss_a = (w * 2 - 3)^2 and loss_b = (w * -1 - 4)^2, summed downstream
    let mut net = DagNetwork::new("fan_out", 4);
    let a = net.add_layer(Dense::with_weights(shared.clone())?, &[Edge::Input(0)])?;
    let b = net.add_layer(Dense::with_weights(shared.clone())?, &[Edge::Input(1)])?;
    let la = net.add_layer(SquareError::new(), &[Edge::Node(a), Edge::Input(2)])?;
    let lb = net.add_layer(SquareError::new(), &[Edge::Node(b), Edge::Input(3)])?;
    net.add_layer(SumInputs::new(2), &[Edge::Node(la), Edge::Node(lb)])?;
    assert_eq!(net.parameters().len(), 1);

    let batch = vec![vec![
        Tensor::vector(vec![2.0]),
        Tensor::vector(vec![-1.0]),
        Tensor::vector(vec![3.0]),
        Tensor::vector(vec![4.0]),
    ]];
    let root = net.forward(&batch)?;
    let mut deltas = DeltaSet::new();
    root.backward(&mut deltas, &ones_like(&root))?;
    assert_eq!(deltas.len(), 1);
    let combined = deltas.get_delta(shared.id()).unwrap().delta().data()[0];

    let path_a = single_path_gradient(&shared, 2.0, 3.0)?;
    let path_b = single_path_gradient(&shared, -1.0, 4.0)?;
    assert_abs_diff_eq!(combined, path_a + path_b, epsilon = 1e-12);
    // closed form: 2(2w-3)*2 + 2(-w-4)*(-1) at w = 0.5
    assert_abs_diff_eq!(combined, -8.0 + 9.0, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_intermediate_fan_out_fires_once() -> Result<(), GraphError> {
    init_logger();
    // hidden = w1 x feeds two heads whose outputs are summed
    let mut net = DagNetwork::new("shared_hidden", 2);
    let w1 = Parameter::new_unnamed(Tensor::new(vec![1.0, -0.5], vec![2, 1])?);
    let hidden = net.add_layer(Dense::with_weights(w1.clone())?, &[Edge::Input(0)])?;
    let head_a = net.add_layer(common::dense(vec![1.0, 2.0], 1, 2), &[Edge::Node(hidden)])?;
    let head_b = net.add_layer(common::dense(vec![-3.0, 0.5], 1, 2), &[Edge::Node(hidden)])?;
    let sum = net.add_layer(SumInputs::new(2), &[Edge::Node(head_a), Edge::Node(head_b)])?;
    net.add_layer(SquareError::new(), &[Edge::Node(sum), Edge::Input(1)])?;

    let rows = regression_rows(&[(vec![1.5], vec![0.0]), (vec![-2.0], vec![1.0])]);
    let root = net.forward(&rows)?;
    let mut deltas = DeltaSet::new();
    root.backward(&mut deltas, &ones_like(&root))?;

    // effective head is [1 - 3, 2 + 0.5] = [-2, 2.5]; pred = (-2 * 1 + 2.5 * -0.5) x = -3.25 x
    // dL/dw1 = sum_i 2 (pred_i - y_i) * x_i * [-2, 2.5]
    let coeff: f64 = [(1.5, 0.0), (-2.0, 1.0)]
        .iter()
        .map(|&(x, y)| 2.0 * (-3.25 * x - y) * x)
        .sum();
    let grad = deltas.get_delta(w1.id()).unwrap().delta().data().to_vec();
    assert_abs_diff_eq!(grad[0], coeff * -2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(grad[1], coeff * 2.5, epsilon = 1e-9);
    assert_eq!(deltas.len(), 3);
    Ok(())
}
