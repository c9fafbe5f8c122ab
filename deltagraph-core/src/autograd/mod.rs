// deltagraph-core/src/autograd/mod.rs

pub mod backward_op;
pub mod delta_set;
pub mod grad_check;
pub mod result;
pub mod state_set;

pub use backward_op::{BackwardOp, LeafBackward};
pub use delta_set::{Delta, DeltaSet};
pub use result::{NodeResult, ResultRef};
pub use state_set::StateSet;
