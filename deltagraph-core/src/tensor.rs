// deltagraph-core/src/tensor.rs

use crate::error::GraphError;
use serde::{Deserialize, Serialize};

/// Dense, row-major `f64` buffer with a shape.
///
/// This is the only numeric container the engine needs: layer outputs,
/// gradients and parameter values are all `Tensor`s. It deliberately carries
/// no autograd metadata; gradient bookkeeping lives in
/// [`DeltaSet`](crate::autograd::DeltaSet) and
/// [`NodeResult`](crate::autograd::NodeResult).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTensor")]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

/// Wire form of [`Tensor`]; checked through [`Tensor::new`] on load.
#[derive(Deserialize)]
struct RawTensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl TryFrom<RawTensor> for Tensor {
    type Error = GraphError;

    fn try_from(raw: RawTensor) -> Result<Self, Self::Error> {
        Tensor::new(raw.data, raw.shape)
    }
}

impl Tensor {
    /// Creates a new tensor from flattened row-major data.
    ///
    /// # Errors
    /// Returns `GraphError::TensorCreationError` if `data.len()` does not match
    /// the number of elements implied by `shape`.
    pub fn new(data: Vec<f64>, shape: Vec<usize>) -> Result<Self, GraphError> {
        let numel: usize = shape.iter().product();
        if numel != data.len() {
            return Err(GraphError::TensorCreationError {
                data_len: data.len(),
                shape,
            });
        }
        Ok(Tensor { shape, data })
    }

    /// A zero-filled tensor of the given shape.
    pub fn zeros(shape: &[usize]) -> Self {
        let numel = shape.iter().product();
        Tensor {
            shape: shape.to_vec(),
            data: vec![0.0; numel],
        }
    }

    /// A tensor filled with `value`.
    pub fn full(shape: &[usize], value: f64) -> Self {
        let numel = shape.iter().product();
        Tensor {
            shape: shape.to_vec(),
            data: vec![value; numel],
        }
    }

    /// A single-element tensor of shape `[1]`.
    pub fn scalar(value: f64) -> Self {
        Tensor {
            shape: vec![1],
            data: vec![value],
        }
    }

    /// A rank-1 tensor wrapping `data`.
    pub fn vector(data: Vec<f64>) -> Self {
        Tensor {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn zeros_like(other: &Tensor) -> Self {
        Tensor::zeros(&other.shape)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Returns the number of elements in the tensor.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Returns the single element of a one-element tensor.
    ///
    /// # Errors
    /// Returns `GraphError::ShapeMismatch` if the tensor holds more than one element.
    pub fn item(&self) -> Result<f64, GraphError> {
        if self.data.len() != 1 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![1],
                actual: self.shape.clone(),
                operation: "item".to_string(),
            });
        }
        Ok(self.data[0])
    }

    /// Checks that `other` has the same shape as `self`.
    pub fn check_same_shape(&self, other: &Tensor, operation: &str) -> Result<(), GraphError> {
        if self.shape != other.shape {
            return Err(GraphError::ShapeMismatch {
                expected: self.shape.clone(),
                actual: other.shape.clone(),
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    /// In-place elementwise `self += other`.
    pub fn add_assign(&mut self, other: &Tensor) -> Result<(), GraphError> {
        self.add_scaled(other, 1.0)
    }

    /// In-place elementwise `self += alpha * other`.
    pub fn add_scaled(&mut self, other: &Tensor, alpha: f64) -> Result<(), GraphError> {
        self.check_same_shape(other, "add_scaled")?;
        self.data
            .iter_mut()
            .zip(other.data.iter())
            .for_each(|(a, &b)| *a += alpha * b);
        Ok(())
    }

    /// Returns a copy with every element multiplied by `factor`.
    pub fn scale(&self, factor: f64) -> Tensor {
        self.map(|x| x * factor)
    }

    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Tensor {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Elementwise combination of two same-shaped tensors.
    pub fn zip_map<F: Fn(f64, f64) -> f64>(
        &self,
        other: &Tensor,
        operation: &str,
        f: F,
    ) -> Result<Tensor, GraphError> {
        self.check_same_shape(other, operation)?;
        Ok(Tensor {
            shape: self.shape.clone(),
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    /// Inner product of two same-shaped tensors.
    pub fn dot(&self, other: &Tensor) -> Result<f64, GraphError> {
        self.check_same_shape(other, "dot")?;
        Ok(self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum())
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn sum_sq(&self) -> f64 {
        self.data.iter().map(|x| x * x).sum()
    }

    /// `true` if no element is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}
