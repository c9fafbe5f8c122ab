use crate::error::GraphError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

static NEXT_PARAM_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a parameter buffer.
///
/// This is the key used by [`DeltaSet`](crate::autograd::DeltaSet) and
/// [`StateSet`](crate::autograd::StateSet): two layers that hold clones of the
/// same `Parameter` share one id, so their gradient contributions are summed
/// into one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParamId(pub u64);

impl ParamId {
    /// Allocates a fresh, process-unique id.
    pub fn next() -> Self {
        ParamId(NEXT_PARAM_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Marks `id` as used so later calls to [`ParamId::next`] never return it.
    /// Called when parameters are reconstructed from persisted state.
    pub fn reserve(id: ParamId) {
        NEXT_PARAM_ID.fetch_max(id.0 + 1, Ordering::Relaxed);
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A learnable parameter buffer owned by a layer.
///
/// `Parameter` is a cheap handle: cloning it clones the `Arc`, not the data.
/// The value is mutated only through [`Parameter::set_value`] and
/// [`Parameter::add_scaled`], which the trainer's commit step and the
/// line-search cursors use; never while a forward/backward pass on the same
/// parameters is in flight.
#[derive(Clone)]
pub struct Parameter {
    id: ParamId,
    name: Option<String>,
    data: Arc<RwLock<Tensor>>,
}

/// Serializable form of a [`Parameter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamState {
    pub id: ParamId,
    pub name: Option<String>,
    pub value: Tensor,
}

impl Parameter {
    /// Creates a new Parameter from a Tensor, allocating a fresh id.
    pub fn new(tensor: Tensor, name: Option<String>) -> Self {
        Self::with_id(ParamId::next(), tensor, name)
    }

    pub fn new_unnamed(tensor: Tensor) -> Self {
        Self::new(tensor, None)
    }

    /// Creates a parameter with an explicit id (used by reconstruction).
    pub fn with_id(id: ParamId, tensor: Tensor, name: Option<String>) -> Self {
        ParamId::reserve(id);
        Parameter {
            id,
            name,
            data: Arc::new(RwLock::new(tensor)),
        }
    }

    pub fn id(&self) -> ParamId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tensor> {
        self.data.read().unwrap_or_else(|poisoned| {
            log::warn!("RwLock for parameter {} was poisoned. Recovering reader guard.", self.id);
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tensor> {
        self.data.write().unwrap_or_else(|poisoned| {
            log::warn!("RwLock for parameter {} was poisoned. Recovering writer guard.", self.id);
            poisoned.into_inner()
        })
    }

    /// Returns a copy of the parameter's shape.
    pub fn shape(&self) -> Vec<usize> {
        self.read().shape().to_vec()
    }

    pub fn numel(&self) -> usize {
        self.read().numel()
    }

    /// Returns a snapshot of the current value.
    pub fn value(&self) -> Tensor {
        self.read().clone()
    }

    /// Runs `f` against the current value without cloning it.
    pub fn with_value<R>(&self, f: impl FnOnce(&Tensor) -> R) -> R {
        f(&self.read())
    }

    /// Overwrites the value.
    ///
    /// # Errors
    /// Returns `GraphError::ShapeMismatch` if `value` has a different shape.
    pub fn set_value(&self, value: Tensor) -> Result<(), GraphError> {
        let mut guard = self.write();
        guard.check_same_shape(&value, "Parameter::set_value")?;
        *guard = value;
        Ok(())
    }

    /// In-place `value += alpha * delta`.
    pub fn add_scaled(&self, delta: &Tensor, alpha: f64) -> Result<(), GraphError> {
        self.write().add_scaled(delta, alpha)
    }

    /// `true` if both handles point at the same buffer.
    pub fn same_buffer(&self, other: &Parameter) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub fn to_state(&self) -> ParamState {
        ParamState {
            id: self.id,
            name: self.name.clone(),
            value: self.value(),
        }
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parameter({}, {:?}, shape={:?})",
            self.id,
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.shape()
        )
    }
}

#[cfg(test)]
#[path = "parameter_test.rs"]
mod tests;
