//! Directed acyclic networks of layers.

pub mod network;

pub use network::{DagNetwork, Edge, EvalOptions, NodeId};
