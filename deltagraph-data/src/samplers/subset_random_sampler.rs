use super::traits::Sampler;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Shuffles a fixed set of indices with a seeded generator.
///
/// The order depends only on the indices and the seed, so a measurement can
/// be repeated exactly. Change the seed to draw a different order.
#[derive(Debug, Clone)]
pub struct SubsetRandomSampler {
    indices: Vec<usize>,
    seed: u64,
}

impl SubsetRandomSampler {
    pub fn new(indices: Vec<usize>, seed: u64) -> Self {
        SubsetRandomSampler { indices, seed }
    }

    /// All indices of a dataset of `len` items.
    pub fn full(len: usize, seed: u64) -> Self {
        Self::new((0..len).collect(), seed)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Sampler for SubsetRandomSampler {
    fn iter(&self, _dataset_len: usize) -> Box<dyn Iterator<Item = usize> + Send + Sync> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut shuffled = self.indices.clone();
        shuffled.shuffle(&mut rng);
        Box::new(shuffled.into_iter())
    }

    fn len(&self, _dataset_len: usize) -> usize {
        self.indices.len()
    }
}

#[cfg(test)]
#[path = "subset_random_sampler_test.rs"]
mod tests;
