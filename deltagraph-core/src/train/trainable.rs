use crate::autograd::delta_set::DeltaSet;
use crate::autograd::state_set::StateSet;
use crate::dag::{DagNetwork, EvalOptions};
use crate::device::DevicePool;
use crate::error::{GraphError, Stage};
use crate::nn::parameter::Parameter;
use crate::tensor::Tensor;
use crate::train::point_sample::PointSample;
use rayon::prelude::*;
use std::sync::Arc;

/// Something an optimizer can measure and move.
///
/// Implementations wrap a network, its loss and a batch of inputs.
/// [`Trainable::measure`] evaluates the loss and its gradient at the current
/// parameter values.
pub trait Trainable: Send {
    fn measure(&mut self) -> Result<PointSample, GraphError>;

    /// Draws a new batch subset. Returns `true` if the subset changed, which
    /// makes earlier measurements incomparable.
    fn reset_sampling(&mut self) -> bool {
        false
    }

    /// Switches to measuring on every available row.
    fn reset_to_full(&mut self) {}

    /// The parameters `measure` reports gradients for.
    fn parameters(&self) -> Vec<Parameter>;
}

impl<T: Trainable + ?Sized> Trainable for Box<T> {
    fn measure(&mut self) -> Result<PointSample, GraphError> {
        (**self).measure()
    }

    fn reset_sampling(&mut self) -> bool {
        (**self).reset_sampling()
    }

    fn reset_to_full(&mut self) {
        (**self).reset_to_full()
    }

    fn parameters(&self) -> Vec<Parameter> {
        (**self).parameters()
    }
}

/// How a batch is split and evaluated.
#[derive(Debug, Clone)]
pub struct MeasureOptions {
    /// Number of partitions evaluated in parallel. Clamped to the batch size.
    pub partitions: usize,
    pub prune: bool,
    /// When set, every partition holds a device lease for its pass.
    pub pool: Option<Arc<DevicePool>>,
}

impl Default for MeasureOptions {
    fn default() -> Self {
        MeasureOptions {
            partitions: rayon::current_num_threads().max(1),
            prune: true,
            pool: None,
        }
    }
}

/// One partition: forward, seed the root with ones, backward.
fn measure_partition(
    network: &DagNetwork,
    rows: &[Vec<Tensor>],
    prune: bool,
) -> Result<(DeltaSet, f64), GraphError> {
    let root = network.forward_with(rows, EvalOptions { prune })?;
    let loss: f64 = root.data().iter().map(Tensor::sum).sum();
    let seed: Vec<Tensor> = root.data().iter().map(|t| Tensor::full(t.shape(), 1.0)).collect();
    let mut deltas = DeltaSet::new();
    root.backward(&mut deltas, &seed)?;
    Ok((deltas, loss))
}

/// Measures the mean loss of `network` over `rows` and its gradient.
///
/// The batch is split into up to `options.partitions` contiguous chunks
/// evaluated in parallel; partial accumulators are merged and the total is
/// divided by the number of rows. The head of the network must produce the
/// per-item loss; all of its elements are summed.
pub fn measure_rows(
    network: &DagNetwork,
    rows: &[Vec<Tensor>],
    options: &MeasureOptions,
) -> Result<PointSample, GraphError> {
    if rows.is_empty() {
        return Err(GraphError::EmptyBatch);
    }
    let partitions = options.partitions.clamp(1, rows.len());
    let chunk = (rows.len() + partitions - 1) / partitions;
    log::debug!(
        "measuring {} rows in {} partition(s) of up to {}",
        rows.len(),
        partitions,
        chunk
    );

    let (delta, sum) = rows
        .par_chunks(chunk)
        .map(|part| {
            let _lease = options.pool.as_ref().map(|pool| pool.acquire());
            measure_partition(network, part, options.prune)
        })
        .try_reduce(
            || (DeltaSet::new(), 0.0),
            |(a, sa), (b, sb)| Ok((a.merged(b)?, sa + sb)),
        )?;

    let n = rows.len();
    let delta = delta.scale(1.0 / n as f64);
    if !delta.is_finite() {
        return Err(GraphError::NonFinite {
            operation: "measure".to_string(),
            stage: Stage::Backward,
        });
    }
    let weights = StateSet::capture(&network.trainable_parameters());
    Ok(PointSample::new(delta, weights, sum, n))
}

/// A network plus a fixed batch of rows.
///
/// Each row holds one tensor per network input (for a supervised loss,
/// typically `[x, y]`).
#[derive(Debug)]
pub struct BasicTrainable {
    network: Arc<DagNetwork>,
    rows: Vec<Vec<Tensor>>,
    options: MeasureOptions,
}

impl BasicTrainable {
    pub fn new(network: Arc<DagNetwork>, rows: Vec<Vec<Tensor>>) -> Self {
        BasicTrainable {
            network,
            rows,
            options: MeasureOptions::default(),
        }
    }

    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.options.partitions = partitions;
        self
    }

    pub fn with_pruning(mut self, prune: bool) -> Self {
        self.options.prune = prune;
        self
    }

    pub fn with_device_pool(mut self, pool: Arc<DevicePool>) -> Self {
        self.options.pool = Some(pool);
        self
    }

    pub fn network(&self) -> &Arc<DagNetwork> {
        &self.network
    }

    pub fn rows(&self) -> &[Vec<Tensor>] {
        &self.rows
    }
}

impl Trainable for BasicTrainable {
    fn measure(&mut self) -> Result<PointSample, GraphError> {
        measure_rows(&self.network, &self.rows, &self.options)
    }

    fn parameters(&self) -> Vec<Parameter> {
        self.network.trainable_parameters()
    }
}

#[cfg(test)]
#[path = "trainable_test.rs"]
mod tests;
