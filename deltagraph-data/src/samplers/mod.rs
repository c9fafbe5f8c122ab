pub mod subset_random_sampler;
pub mod traits;

pub use subset_random_sampler::SubsetRandomSampler;
pub use traits::Sampler;
