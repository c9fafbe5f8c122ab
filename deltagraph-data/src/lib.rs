//! Datasets, samplers and a trainable that measures on a sampled subset.

pub mod datasets;
pub mod sampled_trainable;
pub mod samplers;

pub use datasets::{Dataset, VecDataset};
pub use sampled_trainable::SampledTrainable;
pub use samplers::{Sampler, SubsetRandomSampler};
