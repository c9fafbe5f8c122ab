//! Fixtures shared by this crate's unit tests.

use crate::cursor::{LineSearchCursor, LineSearchPoint};
use crate::error::OptimError;
use crate::monitor::Monitor;
use deltagraph_core::nn::layers::Dense;
use deltagraph_core::nn::losses::SquareError;
use deltagraph_core::utils::testing::regression_rows;
use deltagraph_core::{BasicTrainable, DagNetwork, DeltaSet, Edge, Parameter, PointSample, StateSet, Tensor};
use std::sync::Arc;

/// `loss(w) = (w * x - y)^2` for a single 1x1 weight.
pub fn scalar_regression(w: f64, x: f64, y: f64) -> (Parameter, BasicTrainable) {
    let weight = Parameter::new(Tensor::new(vec![w], vec![1, 1]).expect("1x1"), Some("w".to_string()));
    let mut net = DagNetwork::new("scalar_regression", 2);
    let dense = net
        .add_layer(Dense::with_weights(weight.clone()).expect("matrix"), &[Edge::Input(0)])
        .expect("dense");
    net.add_layer(SquareError::new(), &[Edge::Node(dense), Edge::Input(1)])
        .expect("loss");
    let rows = regression_rows(&[(vec![x], vec![y])]);
    (weight, BasicTrainable::new(Arc::new(net), rows).with_partitions(1))
}

/// A cursor over a closed-form function of the rate: `f(alpha) -> (value, derivative)`.
pub struct FunctionCursor<F: Fn(f64) -> (f64, f64)> {
    f: F,
    origin: PointSample,
    pub probes: Vec<f64>,
}

impl<F: Fn(f64) -> (f64, f64)> FunctionCursor<F> {
    pub fn new(f: F) -> Self {
        let (value, _) = f(0.0);
        FunctionCursor {
            origin: PointSample::new(DeltaSet::new(), StateSet::default(), value, 1),
            f,
            probes: Vec::new(),
        }
    }
}

impl<F: Fn(f64) -> (f64, f64)> LineSearchCursor for FunctionCursor<F> {
    fn direction_kind(&self) -> &str {
        "function"
    }

    fn step(&mut self, alpha: f64, _monitor: &mut dyn Monitor) -> Result<LineSearchPoint, OptimError> {
        self.probes.push(alpha);
        let (value, derivative) = (self.f)(alpha);
        Ok(LineSearchPoint {
            point: PointSample::new(DeltaSet::new(), StateSet::default(), value, 1).with_rate(alpha),
            derivative,
        })
    }

    fn origin(&self) -> &PointSample {
        &self.origin
    }
}
