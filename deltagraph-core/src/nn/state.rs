use crate::dag::{DagNetwork, Edge};
use crate::error::GraphError;
use crate::nn::layer::{Layer, LayerId};
use crate::nn::layers::{Bias, Dense, Relu, SumInputs};
use crate::nn::losses::SquareError;
use crate::nn::parameter::{ParamId, ParamState, Parameter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Serializable description of a layer, sufficient to rebuild it.
///
/// Parameter buffers are stored with their [`ParamId`]; rebuilding through
/// one [`ParamRegistry`] maps every occurrence of an id to the same buffer,
/// so sharing between layers survives a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum LayerState {
    Dense {
        id: LayerId,
        name: String,
        weights: ParamState,
        frozen: bool,
    },
    Bias {
        id: LayerId,
        name: String,
        bias: ParamState,
        frozen: bool,
    },
    Relu {
        id: LayerId,
        name: String,
    },
    SumInputs {
        id: LayerId,
        name: String,
        arity: usize,
    },
    SquareError {
        id: LayerId,
        name: String,
    },
    Network(NetworkState),
}

/// Serializable form of a [`DagNetwork`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkState {
    pub id: LayerId,
    pub name: String,
    pub inputs: usize,
    pub nodes: Vec<NodeState>,
    pub head: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub layer: LayerState,
    pub edges: Vec<Edge>,
}

/// Maps persisted parameter ids to live buffers during reconstruction.
#[derive(Debug, Default)]
pub struct ParamRegistry {
    params: HashMap<ParamId, Parameter>,
}

impl ParamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the buffer for `state.id`, creating it on first sight.
    ///
    /// # Errors
    /// Returns `GraphError::ShapeMismatch` if the same id was seen before with
    /// a different shape.
    pub fn resolve(&mut self, state: &ParamState) -> Result<Parameter, GraphError> {
        if let Some(existing) = self.params.get(&state.id) {
            let shape = existing.shape();
            if shape != state.value.shape() {
                return Err(GraphError::ShapeMismatch {
                    expected: shape,
                    actual: state.value.shape().to_vec(),
                    operation: format!("ParamRegistry::resolve({})", state.id),
                });
            }
            return Ok(existing.clone());
        }
        let param = Parameter::with_id(state.id, state.value.clone(), state.name.clone());
        self.params.insert(state.id, param.clone());
        Ok(param)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl LayerState {
    pub fn id(&self) -> LayerId {
        match self {
            LayerState::Dense { id, .. }
            | LayerState::Bias { id, .. }
            | LayerState::Relu { id, .. }
            | LayerState::SumInputs { id, .. }
            | LayerState::SquareError { id, .. } => *id,
            LayerState::Network(state) => state.id,
        }
    }

    /// Rebuilds the layer, resolving parameters through `registry`.
    pub fn build(&self, registry: &mut ParamRegistry) -> Result<Box<dyn Layer>, GraphError> {
        let layer: Box<dyn Layer> = match self {
            LayerState::Dense {
                id,
                name,
                weights,
                frozen,
            } => Box::new(Dense::restore(*id, name.clone(), registry.resolve(weights)?, *frozen)?),
            LayerState::Bias {
                id,
                name,
                bias,
                frozen,
            } => Box::new(Bias::restore(*id, name.clone(), registry.resolve(bias)?, *frozen)),
            LayerState::Relu { id, name } => Box::new(Relu::restore(*id, name.clone())),
            LayerState::SumInputs { id, name, arity } => {
                Box::new(SumInputs::restore(*id, name.clone(), *arity))
            }
            LayerState::SquareError { id, name } => Box::new(SquareError::restore(*id, name.clone())),
            LayerState::Network(state) => Box::new(DagNetwork::from_state_with(state, registry)?),
        };
        Ok(layer)
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        serde_json::to_string_pretty(self).map_err(|e| GraphError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        serde_json::from_str(json).map_err(|e| GraphError::Serialization(e.to_string()))
    }
}
