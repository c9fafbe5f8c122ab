// src/nn/mod.rs
// Layers, parameters, initialization and persisted layer state.

pub mod init;
pub mod layer;
pub mod layers;
pub mod losses;
pub mod parameter;
pub mod state;

pub use layer::{Layer, LayerId};
pub use layers::{Bias, Dense, Relu, SumInputs};
pub use losses::SquareError;
pub use parameter::{ParamId, ParamState, Parameter};
pub use state::{LayerState, NetworkState, ParamRegistry};
