// deltagraph-core/src/autograd/delta_set.rs

use crate::error::GraphError;
use crate::nn::layer::LayerId;
use crate::nn::parameter::{ParamId, Parameter};
use crate::tensor::Tensor;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Accumulated gradient for one parameter buffer.
///
/// Holds the target parameter handle, the layer that first contributed to it,
/// and a gradient buffer with exactly the target's shape.
#[derive(Debug, Clone)]
pub struct Delta {
    layer: LayerId,
    target: Parameter,
    delta: Tensor,
}

impl Delta {
    fn zeros(layer: LayerId, target: &Parameter) -> Self {
        Delta {
            layer,
            target: target.clone(),
            delta: Tensor::zeros(&target.shape()),
        }
    }

    /// Adds `gradient` elementwise into this slot. Never overwrites.
    ///
    /// # Errors
    /// Returns `GraphError::ShapeMismatch` if `gradient` does not have the
    /// target buffer's shape.
    pub fn accumulate(&mut self, gradient: &Tensor) -> Result<(), GraphError> {
        self.accumulate_scaled(gradient, 1.0)
    }

    pub fn accumulate_scaled(&mut self, gradient: &Tensor, alpha: f64) -> Result<(), GraphError> {
        self.delta.check_same_shape(gradient, "Delta::accumulate")?;
        self.delta.add_scaled(gradient, alpha)
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    pub fn target(&self) -> &Parameter {
        &self.target
    }

    pub fn delta(&self) -> &Tensor {
        &self.delta
    }
}

/// Keyed gradient accumulator.
///
/// Contributions for the same parameter buffer are summed, never overwritten;
/// this is where a buffer shared by several layers, or a node reached along
/// several paths, gets its total gradient. Keys are kept in a `BTreeMap` so
/// [`DeltaSet::to_vector`] has a stable, parameter-indexed order.
#[derive(Debug, Clone, Default)]
pub struct DeltaSet {
    map: BTreeMap<ParamId, Delta>,
}

impl DeltaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the gradient slot for `target`, creating a zero-filled one of
    /// the target's shape on first access.
    ///
    /// The `layer` recorded is the first contributor; later contributors
    /// sharing the buffer accumulate into the same slot.
    pub fn get(&mut self, layer: LayerId, target: &Parameter) -> &mut Delta {
        self.map
            .entry(target.id())
            .or_insert_with(|| Delta::zeros(layer, target))
    }

    /// Shorthand for `get(layer, target).accumulate(gradient)`.
    pub fn accumulate(
        &mut self,
        layer: LayerId,
        target: &Parameter,
        gradient: &Tensor,
    ) -> Result<(), GraphError> {
        self.get(layer, target).accumulate(gradient)
    }

    pub fn get_delta(&self, id: ParamId) -> Option<&Delta> {
        self.map.get(&id)
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

    pub fn iter(&self) -> impl Iterator<Item = (&ParamId, &Delta)> {
        self.map.iter()
    }

    /// Sums `other` into `self`, key by key.
    ///
    /// The per-key sum is associative and commutative, so partial
    /// accumulators from independent batch partitions may be merged in any
    /// order.
    pub fn merge(&mut self, other: DeltaSet) -> Result<(), GraphError> {
        for (id, delta) in other.map {
            match self.map.entry(id) {
                Entry::Occupied(mut slot) => slot.get_mut().accumulate(&delta.delta)?,
                Entry::Vacant(slot) => {
                    slot.insert(delta);
                }
            }
        }
        Ok(())
    }

    /// Consuming form of [`DeltaSet::merge`], convenient for folds.
    pub fn merged(mut self, other: DeltaSet) -> Result<DeltaSet, GraphError> {
        self.merge(other)?;
        Ok(self)
    }

    /// Returns a copy with every slot multiplied by `factor`.
    pub fn scale(&self, factor: f64) -> DeltaSet {
        DeltaSet {
            map: self
                .map
                .iter()
                .map(|(id, d)| {
                    (
                        *id,
                        Delta {
                            layer: d.layer,
                            target: d.target.clone(),
                            delta: d.delta.scale(factor),
                        },
                    )
                })
                .collect(),
        }
    }

    /// `self + alpha * other` as a new set.
    pub fn add_scaled(&self, other: &DeltaSet, alpha: f64) -> Result<DeltaSet, GraphError> {
        let mut result = self.clone();
        for delta in other.map.values() {
            result
                .get(delta.layer, &delta.target)
                .accumulate_scaled(&delta.delta, alpha)?;
        }
        Ok(result)
    }

    /// Inner product over the keys present in both sets.
    pub fn dot(&self, other: &DeltaSet) -> Result<f64, GraphError> {
        let mut sum = 0.0;
        for (id, delta) in &self.map {
            if let Some(o) = other.map.get(id) {
                sum += delta.delta.dot(&o.delta)?;
            }
        }
        Ok(sum)
    }

    /// Euclidean norm over all slots.
    pub fn magnitude(&self) -> f64 {
        self.map.values().map(|d| d.delta.sum_sq()).sum::<f64>().sqrt()
    }

    /// `true` if every slot is finite.
    pub fn is_finite(&self) -> bool {
        self.map.values().all(|d| d.delta.is_finite())
    }

    /// Flattens all slots into one vector, in parameter-id order.
    pub fn to_vector(&self) -> Vec<f64> {
        self.map
            .values()
            .flat_map(|d| d.delta.data().iter().copied())
            .collect()
    }

    /// Builds a set with the same keys and shapes as `self` from a flat vector
    /// laid out like [`DeltaSet::to_vector`].
    ///
    /// # Errors
    /// Returns `GraphError::ShapeMismatch` if `values` has the wrong length.
    pub fn from_vector(&self, values: &[f64]) -> Result<DeltaSet, GraphError> {
        let total: usize = self.map.values().map(|d| d.delta.numel()).sum();
        if total != values.len() {
            return Err(GraphError::ShapeMismatch {
                expected: vec![total],
                actual: vec![values.len()],
                operation: "DeltaSet::from_vector".to_string(),
            });
        }
        let mut offset = 0;
        let mut map = BTreeMap::new();
        for (id, d) in &self.map {
            let n = d.delta.numel();
            let delta = Tensor::new(values[offset..offset + n].to_vec(), d.delta.shape().to_vec())?;
            offset += n;
            map.insert(
                *id,
                Delta {
                    layer: d.layer,
                    target: d.target.clone(),
                    delta,
                },
            );
        }
        Ok(DeltaSet { map })
    }

    /// Applies `param += alpha * delta` to every target buffer.
    pub fn apply(&self, alpha: f64) -> Result<(), GraphError> {
        for delta in self.map.values() {
            delta.target.add_scaled(&delta.delta, alpha)?;
        }
        Ok(())
    }

    /// The parameters this set has slots for, in key order.
    pub fn targets(&self) -> Vec<Parameter> {
        self.map.values().map(|d| d.target.clone()).collect()
    }
}

#[cfg(test)]
#[path = "delta_set_test.rs"]
mod tests;
