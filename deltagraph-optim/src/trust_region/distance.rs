use super::TrustRegion;
use serde::{Deserialize, Serialize};

/// Limits the Euclidean length of a step.
///
/// A candidate further than `max_distance` from the current point is pulled
/// back along the same displacement onto the boundary sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceConstraint {
    pub max_distance: f64,
}

impl DistanceConstraint {
    pub fn new(max_distance: f64) -> Self {
        DistanceConstraint {
            max_distance: max_distance.abs(),
        }
    }
}

impl TrustRegion for DistanceConstraint {
    fn project(&self, current: &[f64], candidate: &[f64]) -> Vec<f64> {
        let norm = current
            .iter()
            .zip(candidate)
            .map(|(c, p)| (p - c) * (p - c))
            .sum::<f64>()
            .sqrt();
        if norm <= self.max_distance || norm == 0.0 {
            return candidate.to_vec();
        }
        let factor = self.max_distance / norm;
        current
            .iter()
            .zip(candidate)
            .map(|(c, p)| c + (p - c) * factor)
            .collect()
    }

    fn name(&self) -> &str {
        "distance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_inside_is_untouched() {
        let region = DistanceConstraint::new(2.0);
        assert_eq!(region.project(&[1.0, 1.0], &[2.0, 2.0]), vec![2.0, 2.0]);
    }

    #[test]
    fn test_outside_lands_on_boundary() {
        let region = DistanceConstraint::new(1.0);
        let out = region.project(&[0.0, 0.0], &[3.0, 4.0]);
        assert_abs_diff_eq!(out[0], 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(out[1], 0.8, epsilon = 1e-12);
    }
}
