use crate::autograd::result::{NodeResult, ResultRef};
use crate::error::GraphError;
use crate::nn::layer::{Layer, LayerId};
use crate::nn::parameter::Parameter;
use crate::nn::state::{LayerState, NetworkState, NodeState, ParamRegistry};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Position of a node inside its network. Nodes only reference earlier
/// positions, so the index order is a topological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Where a node reads one of its inputs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// The network's external input at this index.
    Input(usize),
    /// The output of an earlier node.
    Node(NodeId),
}

#[derive(Debug)]
struct DagNode {
    layer: Box<dyn Layer>,
    edges: Vec<Edge>,
}

/// Options for one forward evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOptions {
    /// When `true` (the default), external inputs are constants and subgraphs
    /// with nothing trainable upstream are dead: their backward is skipped.
    /// When `false`, external inputs are live and every path is traversed.
    /// The parameter gradients are the same either way.
    pub prune: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions { prune: true }
    }
}

/// A directed acyclic graph of layers with one head node.
///
/// Nodes are added with [`DagNetwork::add`] and may only reference external
/// inputs or nodes already present, so cycles cannot be built. A node may
/// feed any number of consumers; during evaluation every node is computed
/// once per forward pass and its result shared, and during backward the
/// result sums all consumer gradients before firing once.
///
/// A `DagNetwork` is itself a [`Layer`], so a whole network can be nested
/// as a single node of a larger one.
#[derive(Debug)]
pub struct DagNetwork {
    id: LayerId,
    name: String,
    inputs: usize,
    nodes: Vec<DagNode>,
    head: Option<NodeId>,
}

impl DagNetwork {
    /// Creates an empty network reading `inputs` external inputs.
    pub fn new(name: impl Into<String>, inputs: usize) -> Self {
        DagNetwork {
            id: LayerId::next(),
            name: name.into(),
            inputs,
            nodes: Vec::new(),
            head: None,
        }
    }

    /// Appends a node and makes it the head.
    ///
    /// # Errors
    /// * `GraphError::UnknownInput` if an edge names an input index `>= inputs`.
    /// * `GraphError::UnknownNode` if an edge names a node not yet added.
    pub fn add(&mut self, layer: Box<dyn Layer>, edges: &[Edge]) -> Result<NodeId, GraphError> {
        for edge in edges {
            match *edge {
                Edge::Input(index) if index >= self.inputs => {
                    return Err(GraphError::UnknownInput {
                        index,
                        available: self.inputs,
                    })
                }
                Edge::Node(node) if node.0 >= self.nodes.len() => {
                    return Err(GraphError::UnknownNode(node.0))
                }
                _ => {}
            }
        }
        let id = NodeId(self.nodes.len());
        log::debug!(
            "{}: adding {} as {} with edges {:?}",
            self.name,
            layer.name(),
            id,
            edges
        );
        self.nodes.push(DagNode {
            layer,
            edges: edges.to_vec(),
        });
        self.head = Some(id);
        Ok(id)
    }

    /// Convenience wrapper around [`DagNetwork::add`] for concrete layers.
    pub fn add_layer<L: Layer + 'static>(&mut self, layer: L, edges: &[Edge]) -> Result<NodeId, GraphError> {
        self.add(Box::new(layer), edges)
    }

    pub fn set_head(&mut self, node: NodeId) -> Result<(), GraphError> {
        if node.0 >= self.nodes.len() {
            return Err(GraphError::UnknownNode(node.0));
        }
        self.head = Some(node);
        Ok(())
    }

    pub fn head(&self) -> Option<NodeId> {
        self.head
    }

    pub fn input_count(&self) -> usize {
        self.inputs
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn layer(&self, node: NodeId) -> Result<&dyn Layer, GraphError> {
        self.nodes
            .get(node.0)
            .map(|n| n.layer.as_ref())
            .ok_or(GraphError::UnknownNode(node.0))
    }

    pub fn layer_mut(&mut self, node: NodeId) -> Result<&mut Box<dyn Layer>, GraphError> {
        self.nodes
            .get_mut(node.0)
            .map(|n| &mut n.layer)
            .ok_or(GraphError::UnknownNode(node.0))
    }

    pub fn edges(&self, node: NodeId) -> Result<&[Edge], GraphError> {
        self.nodes
            .get(node.0)
            .map(|n| n.edges.as_slice())
            .ok_or(GraphError::UnknownNode(node.0))
    }

    /// Freezes or unfreezes one node's layer.
    pub fn freeze_node(&mut self, node: NodeId, frozen: bool) -> Result<(), GraphError> {
        self.layer_mut(node)?.set_frozen(frozen);
        Ok(())
    }

    /// Evaluates the network on a batch with default options.
    ///
    /// `batch` holds one row per item; each row holds one tensor per external
    /// input.
    pub fn forward(&self, batch: &[Vec<Tensor>]) -> Result<ResultRef, GraphError> {
        self.forward_with(batch, EvalOptions::default())
    }

    pub fn forward_with(&self, batch: &[Vec<Tensor>], options: EvalOptions) -> Result<ResultRef, GraphError> {
        if batch.is_empty() {
            return Err(GraphError::EmptyBatch);
        }
        let mut columns: Vec<Vec<Tensor>> = vec![Vec::with_capacity(batch.len()); self.inputs];
        for row in batch {
            if row.len() != self.inputs {
                return Err(GraphError::ArityMismatch {
                    expected: self.inputs,
                    actual: row.len(),
                    operation: self.name.clone(),
                });
            }
            for (column, tensor) in columns.iter_mut().zip(row) {
                column.push(tensor.clone());
            }
        }
        let inputs = columns
            .into_iter()
            .map(|column| {
                if options.prune {
                    NodeResult::constant(column)
                } else {
                    NodeResult::input(column)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.evaluate(&inputs)
    }

    /// Evaluates the head over already-wrapped input results.
    ///
    /// Only nodes the head depends on are evaluated, each exactly once, in
    /// index order; results are memoized per call.
    pub fn evaluate(&self, inputs: &[ResultRef]) -> Result<ResultRef, GraphError> {
        let head = self
            .head
            .ok_or_else(|| GraphError::InternalError(format!("{} has no nodes", self.name)))?;
        if inputs.len() != self.inputs {
            return Err(GraphError::ArityMismatch {
                expected: self.inputs,
                actual: inputs.len(),
                operation: self.name.clone(),
            });
        }

        let needed = self.reachable_from(head);
        let mut memo: HashMap<NodeId, ResultRef> = HashMap::with_capacity(needed.len());
        for index in 0..=head.0 {
            let id = NodeId(index);
            if !needed.contains(&id) {
                continue;
            }
            let node = &self.nodes[index];
            let args = node
                .edges
                .iter()
                .map(|edge| match *edge {
                    Edge::Input(i) => Ok(inputs[i].clone()),
                    Edge::Node(n) => memo
                        .get(&n)
                        .cloned()
                        .ok_or(GraphError::UnknownNode(n.0)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let result = node.layer.eval(&args)?;
            log::trace!(
                "{}: evaluated {} ({}) alive={}",
                self.name,
                id,
                node.layer.name(),
                result.is_alive()
            );
            memo.insert(id, result);
        }
        memo.remove(&head)
            .ok_or_else(|| GraphError::InternalError(format!("{}: head not evaluated", self.name)))
    }

    fn reachable_from(&self, head: NodeId) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut stack = vec![head];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            for edge in &self.nodes[id.0].edges {
                if let Edge::Node(n) = edge {
                    stack.push(*n);
                }
            }
        }
        seen
    }

    /// Every distinct parameter buffer in the network, in node order.
    pub fn parameters(&self) -> Vec<Parameter> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .flat_map(|n| n.layer.parameters())
            .filter(|p| seen.insert(p.id()))
            .collect()
    }

    /// Parameters of layers that are not frozen.
    pub fn trainable_parameters(&self) -> Vec<Parameter> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .filter(|n| !n.layer.is_frozen())
            .flat_map(|n| n.layer.parameters())
            .filter(|p| seen.insert(p.id()))
            .collect()
    }

    pub fn to_network_state(&self) -> NetworkState {
        NetworkState {
            id: self.id,
            name: self.name.clone(),
            inputs: self.inputs,
            nodes: self
                .nodes
                .iter()
                .map(|n| NodeState {
                    layer: n.layer.to_state(),
                    edges: n.edges.clone(),
                })
                .collect(),
            head: self.head.map(|h| h.0),
        }
    }

    /// Rebuilds a network from its persisted form. Shared parameter buffers
    /// are shared again, and layer and parameter ids are preserved.
    pub fn from_state(state: &NetworkState) -> Result<Self, GraphError> {
        Self::from_state_with(state, &mut ParamRegistry::new())
    }

    pub(crate) fn from_state_with(state: &NetworkState, registry: &mut ParamRegistry) -> Result<Self, GraphError> {
        LayerId::reserve(state.id);
        let mut network = DagNetwork {
            id: state.id,
            name: state.name.clone(),
            inputs: state.inputs,
            nodes: Vec::with_capacity(state.nodes.len()),
            head: None,
        };
        for node in &state.nodes {
            network.add(node.layer.build(registry)?, &node.edges)?;
        }
        match state.head {
            Some(head) => network.set_head(NodeId(head))?,
            None => network.head = None,
        }
        Ok(network)
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        self.to_state().to_json()
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        match LayerState::from_json(json)? {
            LayerState::Network(state) => Self::from_state(&state),
            other => Err(GraphError::Serialization(format!(
                "expected a network, found layer {:?}",
                other.id()
            ))),
        }
    }
}

impl Layer for DagNetwork {
    fn id(&self) -> LayerId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn eval(&self, inputs: &[ResultRef]) -> Result<ResultRef, GraphError> {
        self.evaluate(inputs)
    }

    fn parameters(&self) -> Vec<Parameter> {
        DagNetwork::parameters(self)
    }

    /// A network is frozen when none of its layers is trainable.
    fn is_frozen(&self) -> bool {
        self.nodes.iter().all(|n| !n.layer.is_trainable())
    }

    fn set_frozen(&mut self, frozen: bool) {
        for node in &mut self.nodes {
            node.layer.set_frozen(frozen);
        }
    }

    fn to_state(&self) -> LayerState {
        LayerState::Network(self.to_network_state())
    }
}

#[cfg(test)]
#[path = "network_test.rs"]
mod tests;
