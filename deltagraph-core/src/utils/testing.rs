use crate::tensor::Tensor;

/// Checks if a tensor has the expected shape and its data is within `tolerance`.
/// Panics if shapes differ or data differs significantly.
pub fn check_tensor_near(actual: &Tensor, expected_shape: &[usize], expected_data: &[f64], tolerance: f64) {
    assert_eq!(actual.shape(), expected_shape, "Shape mismatch");
    assert_eq!(
        actual.data().len(),
        expected_data.len(),
        "Data length mismatch"
    );
    for (i, (a, e)) in actual.data().iter().zip(expected_data.iter()).enumerate() {
        let diff = (a - e).abs();
        if diff > tolerance {
            panic!(
                "Data mismatch at index {}: actual={:?}, expected={:?}, diff={:?}, tolerance={:?}",
                i, a, e, diff, tolerance
            );
        }
    }
}

/// Builds a single-input batch: one row per item, each row holding one vector.
pub fn inputs_of(items: &[Vec<f64>]) -> Vec<Vec<Tensor>> {
    items.iter().map(|v| vec![Tensor::vector(v.clone())]).collect()
}

/// Builds a `(x, y)` regression batch for networks with two inputs.
pub fn regression_rows(pairs: &[(Vec<f64>, Vec<f64>)]) -> Vec<Vec<Tensor>> {
    pairs
        .iter()
        .map(|(x, y)| vec![Tensor::vector(x.clone()), Tensor::vector(y.clone())])
        .collect()
}
