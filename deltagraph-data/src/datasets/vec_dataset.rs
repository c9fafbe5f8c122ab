use super::traits::Dataset;
use deltagraph_core::{GraphError, Tensor};

/// A dataset backed by a `Vec` of items. `get` clones.
#[derive(Debug, Clone)]
pub struct VecDataset<T: Clone + Send + Sync + 'static> {
    data: Vec<T>,
}

impl<T: Clone + Send + Sync + 'static> VecDataset<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl VecDataset<Vec<Tensor>> {
    /// Regression rows `[x, y]` from pairs of plain vectors.
    pub fn from_pairs(pairs: &[(Vec<f64>, Vec<f64>)]) -> Self {
        Self::new(deltagraph_core::utils::testing::regression_rows(pairs))
    }
}

impl<T: Clone + Send + Sync + 'static> Dataset for VecDataset<T> {
    type Item = T;

    fn get(&self, index: usize) -> Result<Self::Item, GraphError> {
        self.data
            .get(index)
            .cloned()
            .ok_or(GraphError::IndexOutOfBounds {
                index,
                len: self.data.len(),
            })
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
#[path = "vec_dataset_test.rs"]
mod tests;
