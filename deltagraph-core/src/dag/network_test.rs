use super::*;
use crate::autograd::backward_op::BackwardOp;
use crate::autograd::delta_set::DeltaSet;
use crate::nn::layers::{Bias, Dense, Relu, SumInputs};
use crate::nn::losses::SquareError;
use crate::utils::testing::inputs_of;
use approx::assert_abs_diff_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Identity layer that counts its evaluations.
#[derive(Debug)]
struct Counting {
    id: LayerId,
    evals: Arc<AtomicUsize>,
}

#[derive(Debug)]
struct PassThrough {
    input: ResultRef,
}

impl BackwardOp for PassThrough {
    fn backward(&self, deltas: &mut DeltaSet, grad: &[Tensor]) -> Result<(), GraphError> {
        self.input.backward(deltas, grad)
    }
}

impl Layer for Counting {
    fn id(&self) -> LayerId {
        self.id
    }
    fn name(&self) -> &str {
        "counting"
    }
    fn eval(&self, inputs: &[ResultRef]) -> Result<ResultRef, GraphError> {
        self.evals.fetch_add(1, Ordering::SeqCst);
        NodeResult::new(
            "counting",
            inputs[0].data().to_vec(),
            inputs,
            false,
            Box::new(PassThrough {
                input: inputs[0].clone(),
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
            name: "counting".to_string(),
        }
    }
}

fn scalar_dense(w: f64) -> Dense {
    Dense::with_weights(Parameter::new_unnamed(Tensor::new(vec![w], vec![1, 1]).unwrap())).unwrap()
}

#[test]
fn test_add_rejects_unknown_references() {
    let mut net = DagNetwork::new("net", 1);
    assert!(matches!(
        net.add_layer(Relu::new(), &[Edge::Input(1)]),
        Err(GraphError::UnknownInput { index: 1, available: 1 })
    ));
    assert!(matches!(
        net.add_layer(Relu::new(), &[Edge::Node(NodeId(0))]),
        Err(GraphError::UnknownNode(0))
    ));
    let first = net.add_layer(Relu::new(), &[Edge::Input(0)]).unwrap();
    assert_eq!(first, NodeId(0));
    assert_eq!(net.head(), Some(first));
    assert!(net.set_head(NodeId(5)).is_err());
}

#[test]
fn test_forward_validates_batch() {
    let mut net = DagNetwork::new("net", 2);
    net.add_layer(SumInputs::new(2), &[Edge::Input(0), Edge::Input(1)])
        .unwrap();
    assert!(matches!(net.forward(&[]), Err(GraphError::EmptyBatch)));
    assert!(matches!(
        net.forward(&inputs_of(&[vec![1.0]])),
        Err(GraphError::ArityMismatch { .. })
    ));
    assert!(matches!(
        DagNetwork::new("empty", 1).forward(&inputs_of(&[vec![1.0]])),
        Err(GraphError::InternalError(_))
    ));
}

#[test]
fn test_diamond_evaluates_shared_node_once() -> Result<(), GraphError> {
    let evals = Arc::new(AtomicUsize::new(0));
    let mut net = DagNetwork::new("diamond", 1);
    let shared = net.add_layer(scalar_dense(2.0), &[Edge::Input(0)])?;
    let counted = net.add_layer(
        Counting {
            id: LayerId::next(),
            evals: evals.clone(),
        },
        &[Edge::Node(shared)],
    )?;
    let left = net.add_layer(scalar_dense(3.0), &[Edge::Node(counted)])?;
    let right = net.add_layer(scalar_dense(5.0), &[Edge::Node(counted)])?;
    net.add_layer(SumInputs::new(2), &[Edge::Node(left), Edge::Node(right)])?;

    let out = net.forward(&inputs_of(&[vec![1.0]]))?;
    assert_eq!(evals.load(Ordering::SeqCst), 1);
    assert_abs_diff_eq!(out.data()[0].item()?, 16.0, epsilon = 1e-12);

    // d/dw_shared of (3 + 5) * w_shared * x = 8
    let mut deltas = DeltaSet::new();
    out.backward(&mut deltas, &[Tensor::scalar(1.0)])?;
    let shared_param = net.layer(shared)?.parameters()[0].id();
    assert_abs_diff_eq!(
        deltas.get_delta(shared_param).unwrap().delta().data()[0],
        8.0,
        epsilon = 1e-12
    );
    Ok(())
}

#[test]
fn test_nodes_off_the_head_path_are_skipped() -> Result<(), GraphError> {
    let evals = Arc::new(AtomicUsize::new(0));
    let mut net = DagNetwork::new("net", 1);
    let used = net.add_layer(scalar_dense(1.0), &[Edge::Input(0)])?;
    net.add_layer(
        Counting {
            id: LayerId::next(),
            evals: evals.clone(),
        },
        &[Edge::Input(0)],
    )?;
    net.set_head(used)?;
    net.forward(&inputs_of(&[vec![1.0]]))?;
    assert_eq!(evals.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn test_pruned_and_unpruned_gradients_match() -> Result<(), GraphError> {
    let mut net = DagNetwork::new("net", 2);
    let hidden = net.add_layer(
        Dense::with_weights(Parameter::new_unnamed(Tensor::new(vec![0.5, -1.0], vec![2, 1])?))?,
        &[Edge::Input(0)],
    )?;
    let act = net.add_layer(Relu::new(), &[Edge::Node(hidden)])?;
    let mut frozen = Dense::with_weights(Parameter::new_unnamed(Tensor::new(vec![2.0, 3.0], vec![1, 2])?))?;
    frozen.set_frozen(true);
    let out = net.add_layer(frozen, &[Edge::Node(act)])?;
    net.add_layer(SquareError::new(), &[Edge::Node(out), Edge::Input(1)])?;

    let batch = vec![
        vec![Tensor::vector(vec![2.0]), Tensor::vector(vec![1.0])],
        vec![Tensor::vector(vec![-1.0]), Tensor::vector(vec![0.5])],
    ];
    let grads = |prune: bool| -> Result<DeltaSet, GraphError> {
        let root = net.forward_with(&batch, EvalOptions { prune })?;
        let mut deltas = DeltaSet::new();
        let seed: Vec<Tensor> = root.data().iter().map(|_| Tensor::scalar(1.0)).collect();
        root.backward(&mut deltas, &seed)?;
        Ok(deltas)
    };
    let pruned = grads(true)?;
    let full = grads(false)?;
    assert_eq!(pruned.len(), 1);
    assert_eq!(pruned.keys().collect::<Vec<_>>(), full.keys().collect::<Vec<_>>());
    for (a, b) in pruned.to_vector().iter().zip(full.to_vector()) {
        assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
    }
    Ok(())
}

#[test]
fn test_nested_network_is_a_layer() -> Result<(), GraphError> {
    let mut inner = DagNetwork::new("inner", 1);
    let d = inner.add_layer(scalar_dense(3.0), &[Edge::Input(0)])?;
    inner.add_layer(Bias::with_bias(Parameter::new_unnamed(Tensor::vector(vec![1.0]))), &[Edge::Node(d)])?;
    assert_eq!(Layer::parameters(&inner).len(), 2);
    assert!(!Layer::is_frozen(&inner));

    let mut outer = DagNetwork::new("outer", 1);
    let n = outer.add_layer(inner, &[Edge::Input(0)])?;
    outer.add_layer(Relu::new(), &[Edge::Node(n)])?;
    let out = outer.forward(&inputs_of(&[vec![2.0]]))?;
    assert_abs_diff_eq!(out.data()[0].item()?, 7.0, epsilon = 1e-12);
    assert_eq!(outer.parameters().len(), 2);

    outer.layer_mut(n)?.set_frozen(true);
    assert!(outer.trainable_parameters().is_empty());
    let dead = outer.forward(&inputs_of(&[vec![2.0]]))?;
    assert!(!dead.is_alive());
    Ok(())
}

#[test]
fn test_parameters_are_deduplicated() -> Result<(), GraphError> {
    let shared = Parameter::new_unnamed(Tensor::new(vec![1.0], vec![1, 1])?);
    let mut net = DagNetwork::new("net", 1);
    let a = net.add_layer(Dense::with_weights(shared.clone())?, &[Edge::Input(0)])?;
    let b = net.add_layer(Dense::with_weights(shared.clone())?, &[Edge::Input(0)])?;
    net.add_layer(SumInputs::new(2), &[Edge::Node(a), Edge::Node(b)])?;
    assert_eq!(net.parameters().len(), 1);
    Ok(())
}

#[test]
fn test_state_round_trip_preserves_structure() -> Result<(), GraphError> {
    let mut net = DagNetwork::new("net", 1);
    let a = net.add_layer(scalar_dense(1.5), &[Edge::Input(0)])?;
    net.add_layer(Relu::new(), &[Edge::Node(a)])?;
    let state = net.to_network_state();
    let rebuilt = DagNetwork::from_state(&state)?;
    assert_eq!(rebuilt.to_network_state(), state);
    assert_eq!(rebuilt.node_count(), 2);
    assert_eq!(rebuilt.id(), net.id());
    Ok(())
}
