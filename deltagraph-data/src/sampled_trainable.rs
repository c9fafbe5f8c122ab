use crate::datasets::Dataset;
use crate::samplers::{Sampler, SubsetRandomSampler};
use deltagraph_core::train::{measure_rows, MeasureOptions};
use deltagraph_core::{DagNetwork, GraphError, Parameter, PointSample, Tensor, Trainable};
use std::sync::Arc;

/// Measures a network on a seeded subset of a dataset.
///
/// The subset is the first `sample_size` indices of a shuffle keyed by
/// `seed`, so repeated measurements see the same rows until
/// [`Trainable::reset_sampling`] advances the key. After
/// [`Trainable::reset_to_full`] every row is used.
#[derive(Debug)]
pub struct SampledTrainable<D> {
    network: Arc<DagNetwork>,
    dataset: Arc<D>,
    sample_size: usize,
    seed: u64,
    full: bool,
    options: MeasureOptions,
}

impl<D> SampledTrainable<D>
where
    D: Dataset<Item = Vec<Tensor>>,
{
    pub fn new(network: Arc<DagNetwork>, dataset: Arc<D>, sample_size: usize, seed: u64) -> Self {
        SampledTrainable {
            network,
            dataset,
            sample_size,
            seed,
            full: false,
            options: MeasureOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MeasureOptions) -> Self {
        self.options = options;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn is_full(&self) -> bool {
        self.full || self.sample_size >= self.dataset.len()
    }

    /// Dataset indices the next measurement will visit.
    pub fn indices(&self) -> Vec<usize> {
        let len = self.dataset.len();
        if self.is_full() {
            return (0..len).collect();
        }
        SubsetRandomSampler::full(len, self.seed)
            .iter(len)
            .take(self.sample_size)
            .collect()
    }

    fn rows(&self) -> Result<Vec<Vec<Tensor>>, GraphError> {
        self.indices().into_iter().map(|i| self.dataset.get(i)).collect()
    }
}

impl<D> Trainable for SampledTrainable<D>
where
    D: Dataset<Item = Vec<Tensor>>,
{
    fn measure(&mut self) -> Result<PointSample, GraphError> {
        let rows = self.rows()?;
        log::debug!(
            "measuring {} of {} rows (seed {})",
            rows.len(),
            self.dataset.len(),
            self.seed
        );
        measure_rows(&self.network, &rows, &self.options)
    }

    fn reset_sampling(&mut self) -> bool {
        if self.is_full() {
            return false;
        }
        self.seed = self.seed.wrapping_add(1);
        log::debug!("sampling key advanced to {}", self.seed);
        true
    }

    fn reset_to_full(&mut self) {
        self.full = true;
    }

    fn parameters(&self) -> Vec<Parameter> {
        self.network.trainable_parameters()
    }
}

#[cfg(test)]
#[path = "sampled_trainable_test.rs"]
mod tests;
