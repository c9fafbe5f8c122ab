use approx::assert_abs_diff_eq;
use deltagraph_core::nn::layers::{Bias, Relu, SumInputs};
use deltagraph_core::nn::losses::SquareError;
use deltagraph_core::nn::init;
use deltagraph_core::utils::testing::regression_rows;
use deltagraph_core::{BasicTrainable, DagNetwork, DeltaSet, Edge, EvalOptions, GraphError, Layer, Trainable};
use std::sync::Arc;

mod common;
use common::{init_logger, ones_like};

/// Two branches from the same input: one frozen (dead under pruning), one
/// trainable, joined before the loss.
fn branched_network(seed: u64) -> Result<DagNetwork, GraphError> {
    let mut net = DagNetwork::new("branched", 2);

    let frozen_dense = common::dense(vec![0.0; 6], 3, 2);
    init::normal_(frozen_dense.weights(), 0.0, 1.0, seed)?;
    let frozen = net.add_layer(frozen_dense, &[Edge::Input(0)])?;
    net.freeze_node(frozen, true)?;
    let frozen_act = net.add_layer(Relu::new(), &[Edge::Node(frozen)])?;

    let live_dense = common::dense(vec![0.0; 6], 3, 2);
    init::normal_(live_dense.weights(), 0.0, 1.0, seed + 1)?;
    let live = net.add_layer(live_dense, &[Edge::Input(0)])?;
    let live_bias = net.add_layer(Bias::new(3), &[Edge::Node(live)])?;

    let joined = net.add_layer(SumInputs::new(2), &[Edge::Node(frozen_act), Edge::Node(live_bias)])?;
    let head = net.add_layer(common::dense(vec![1.0, -1.0, 0.5], 1, 3), &[Edge::Node(joined)])?;
    net.add_layer(SquareError::new(), &[Edge::Node(head), Edge::Input(1)])?;
    Ok(net)
}

fn rows() -> Vec<Vec<deltagraph_core::Tensor>> {
    regression_rows(&[
        (vec![0.5, -1.0], vec![1.0]),
        (vec![2.0, 0.25], vec![-0.5]),
        (vec![-1.5, 1.0], vec![2.0]),
    ])
}

fn gradients(net: &DagNetwork, prune: bool) -> Result<DeltaSet, GraphError> {
    let root = net.forward_with(&rows(), EvalOptions { prune })?;
    let mut deltas = DeltaSet::new();
    root.backward(&mut deltas, &ones_like(&root))?;
    Ok(deltas)
}

#[test]
fn test_pruning_does_not_change_gradients() -> Result<(), GraphError> {
    init_logger();
    let net = branched_network(42)?;
    let pruned = gradients(&net, true)?;
    let full = gradients(&net, false)?;

    assert_eq!(pruned.keys().collect::<Vec<_>>(), full.keys().collect::<Vec<_>>());
    assert_eq!(pruned.len(), 3);
    for (a, b) in pruned.to_vector().iter().zip(full.to_vector()) {
        assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
    }
    Ok(())
}

#[test]
fn test_frozen_branch_is_dead_under_pruning() -> Result<(), GraphError> {
    init_logger();
    let net = branched_network(7)?;
    let frozen_only = {
        let mut sub = DagNetwork::new("frozen_only", 1);
        let layer = common::dense(vec![1.0, 1.0], 1, 2);
        let node = sub.add_layer(layer, &[Edge::Input(0)])?;
        sub.freeze_node(node, true)?;
        sub
    };
    let out = frozen_only.forward(&[vec![deltagraph_core::Tensor::vector(vec![1.0, 2.0])]])?;
    assert!(!out.is_alive());
    let out = frozen_only.forward_with(
        &[vec![deltagraph_core::Tensor::vector(vec![1.0, 2.0])]],
        EvalOptions { prune: false },
    )?;
    assert!(out.is_alive());

    assert!(Layer::parameters(&net).len() > net.trainable_parameters().len());
    Ok(())
}

#[test]
fn test_trainable_measure_matches_across_pruning_and_partitions() -> Result<(), GraphError> {
    init_logger();
    let net = Arc::new(branched_network(3)?);
    let a = BasicTrainable::new(net.clone(), rows()).with_partitions(1).measure()?;
    let b = BasicTrainable::new(net, rows())
        .with_partitions(3)
        .with_pruning(false)
        .measure()?;
    assert_abs_diff_eq!(a.value(), b.value(), epsilon = 1e-12);
    for (x, y) in a.delta().to_vector().iter().zip(b.delta().to_vector()) {
        assert_abs_diff_eq!(*x, y, epsilon = 1e-12);
    }
    Ok(())
}
