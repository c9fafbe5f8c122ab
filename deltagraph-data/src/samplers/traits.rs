use std::fmt::Debug;

/// Produces the dataset indices a measurement visits.
pub trait Sampler: Debug + Send + Sync {
    /// Iterates over indices into a dataset of `dataset_len` items.
    fn iter(&self, dataset_len: usize) -> Box<dyn Iterator<Item = usize> + Send + Sync>;

    /// Number of indices `iter` yields for a dataset of `dataset_len` items.
    fn len(&self, dataset_len: usize) -> usize;
}
