// deltagraph-core/src/autograd/state_set.rs

use crate::autograd::delta_set::DeltaSet;
use crate::error::GraphError;
use crate::nn::parameter::{ParamId, Parameter};
use crate::tensor::Tensor;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct State {
    target: Parameter,
    value: Tensor,
}

/// Snapshot of parameter values, keyed by parameter id.
///
/// A `StateSet` is a value, not a view: later mutation of the parameters does
/// not change it. [`StateSet::restore`] writes the snapshot back, which is how
/// line-search cursors return to their origin between probes and how the
/// trainer rolls back a rejected step.
#[derive(Debug, Clone, Default)]
pub struct StateSet {
    map: BTreeMap<ParamId, State>,
}

impl StateSet {
    /// Captures the current value of every parameter. Duplicate handles to
    /// the same buffer collapse into one entry.
    pub fn capture(params: &[Parameter]) -> Self {
        let map = params
            .iter()
            .map(|p| {
                (
                    p.id(),
                    State {
                        target: p.clone(),
                        value: p.value(),
                    },
                )
            })
            .collect();
        StateSet { map }
    }

    /// Writes every captured value back into its parameter.
    pub fn restore(&self) -> Result<(), GraphError> {
        for state in self.map.values() {
            state.target.set_value(state.value.clone())?;
        }
        Ok(())
    }

    pub fn get(&self, id: ParamId) -> Option<&Tensor> {
        self.map.get(&id).map(|s| &s.value)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = ParamId> + '_ {
        self.map.keys().copied()
    }

    pub fn params(&self) -> Vec<Parameter> {
        self.map.values().map(|s| s.target.clone()).collect()
    }

    /// Flattens the values of the keys in `keys` (in that order) into one vector.
    ///
    /// # Errors
    /// Returns `GraphError::UnknownParameter` if a key was not captured.
    pub fn vector_for(&self, keys: &[ParamId]) -> Result<Vec<f64>, GraphError> {
        let mut out = Vec::new();
        for id in keys {
            let state = self.map.get(id).ok_or(GraphError::UnknownParameter(id.0))?;
            out.extend_from_slice(state.value.data());
        }
        Ok(out)
    }

    /// Flattens every value, in parameter-id order.
    pub fn to_vector(&self) -> Vec<f64> {
        self.map
            .values()
            .flat_map(|s| s.value.data().iter().copied())
            .collect()
    }

    /// Returns `self + alpha * delta` without touching the parameters.
    /// Keys of `delta` absent from `self` are an error.
    pub fn add_delta(&self, delta: &DeltaSet, alpha: f64) -> Result<StateSet, GraphError> {
        let mut result = self.clone();
        for (id, d) in delta.iter() {
            let state = result.map.get_mut(id).ok_or(GraphError::UnknownParameter(id.0))?;
            state.value.add_scaled(d.delta(), alpha)?;
        }
        Ok(result)
    }

    /// Overwrites the values of `keys` from a flat vector and writes them into
    /// the parameters. Counterpart of [`StateSet::vector_for`].
    pub fn write_vector(&self, keys: &[ParamId], values: &[f64]) -> Result<(), GraphError> {
        let mut offset = 0;
        for id in keys {
            let state = self.map.get(id).ok_or(GraphError::UnknownParameter(id.0))?;
            let n = state.value.numel();
            if offset + n > values.len() {
                return Err(GraphError::ShapeMismatch {
                    expected: vec![offset + n],
                    actual: vec![values.len()],
                    operation: "StateSet::write_vector".to_string(),
                });
            }
            let value = Tensor::new(values[offset..offset + n].to_vec(), state.value.shape().to_vec())?;
            state.target.set_value(value)?;
            offset += n;
        }
        Ok(())
    }

    /// Euclidean distance between two snapshots over their common keys.
    pub fn distance(&self, other: &StateSet) -> Result<f64, GraphError> {
        let mut sum = 0.0;
        for (id, s) in &self.map {
            if let Some(o) = other.map.get(id) {
                let diff = s.value.zip_map(&o.value, "StateSet::distance", |a, b| a - b)?;
                sum += diff.sum_sq();
            }
        }
        Ok(sum.sqrt())
    }
}
