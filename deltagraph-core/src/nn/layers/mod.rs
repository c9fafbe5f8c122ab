// src/nn/layers/mod.rs

pub mod bias;
pub mod dense;
pub mod relu;
pub mod sum_inputs;

pub use bias::Bias;
pub use dense::Dense;
pub use relu::Relu;
pub use sum_inputs::SumInputs;
