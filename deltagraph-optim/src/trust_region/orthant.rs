use super::TrustRegion;

/// Keeps every coordinate in the orthant of the current point.
///
/// A coordinate whose candidate value would change sign is clamped to zero.
/// Coordinates that are currently zero may move either way. Pairs well with
/// sparsity-seeking objectives, since weights that reach zero stay there
/// until the gradient pushes them out again.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SingleOrthant;

impl SingleOrthant {
    pub fn new() -> Self {
        SingleOrthant
    }
}

impl TrustRegion for SingleOrthant {
    fn project(&self, current: &[f64], candidate: &[f64]) -> Vec<f64> {
        current
            .iter()
            .zip(candidate)
            .map(|(&c, &p)| if c * p < 0.0 { 0.0 } else { p })
            .collect()
    }

    fn name(&self) -> &str {
        "single_orthant"
    }
}
