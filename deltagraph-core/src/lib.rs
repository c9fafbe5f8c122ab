//! Reverse-mode gradient engine over directed acyclic graphs of layers.
//!
//! A forward pass through a [`DagNetwork`](dag::DagNetwork) produces
//! [`NodeResult`](autograd::NodeResult)s that pair each node's output with a
//! deferred [`BackwardOp`](autograd::BackwardOp). Backward deposits parameter
//! gradients into a [`DeltaSet`](autograd::DeltaSet), which sums contributions
//! for buffers shared across paths.

pub mod autograd;
pub mod dag;
pub mod device;
pub mod error;
pub mod nn;
pub mod tensor;
pub mod train;
pub mod utils;

pub use autograd::{DeltaSet, NodeResult, ResultRef, StateSet};
pub use dag::{DagNetwork, Edge, EvalOptions, NodeId};
pub use error::{GraphError, Stage};
pub use nn::{Layer, LayerId, Parameter};
pub use tensor::Tensor;
pub use train::{BasicTrainable, PointSample, Trainable};
