use approx::assert_abs_diff_eq;
use deltagraph_core::Trainable;
use deltagraph_optim::{
    DistanceConstraint, GradientDescent, IterativeTrainer, OptimError, SingleOrthant,
    TrainerConfig, TrustRegion, TrustRegionStrategy,
};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use std::sync::Arc;

mod common;
use common::{init_logger, scalar_regression};

fn norm(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

fn random_pairs(seed: u64, dim: usize, count: usize) -> Vec<(Vec<f64>, Vec<f64>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let w = (0..dim).map(|_| rng.gen_range(-5.0..5.0)).collect();
            let p = (0..dim).map(|_| rng.gen_range(-20.0..20.0)).collect();
            (w, p)
        })
        .collect()
}

#[test]
fn test_projection_is_idempotent() {
    init_logger();
    let regions: Vec<Box<dyn TrustRegion>> =
        vec![Box::new(DistanceConstraint::new(1.5)), Box::new(SingleOrthant::new())];
    for region in &regions {
        for (w, p) in random_pairs(17, 5, 50) {
            let once = region.project(&w, &p);
            let twice = region.project(&w, &once);
            for (a, b) in once.iter().zip(&twice) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
            }
        }
    }
}

#[test]
fn test_distance_projection_lands_on_boundary() {
    init_logger();
    let max = 2.5;
    let region = DistanceConstraint::new(max);
    for (w, p) in random_pairs(3, 4, 50) {
        let projected = region.project(&w, &p);
        if norm(&w, &p) > max {
            assert_abs_diff_eq!(norm(&w, &projected), max, epsilon = 1e-9);
            // same direction as the original displacement
            let along: f64 = w
                .iter()
                .zip(&p)
                .zip(&projected)
                .map(|((wi, pi), qi)| (pi - wi) * (qi - wi))
                .sum();
            assert!(along > 0.0);
        } else {
            assert_eq!(projected, p);
        }
    }
}

#[test]
fn test_trainer_respects_distance_per_step() -> Result<(), OptimError> {
    init_logger();
    let (weight, mut subject) = scalar_regression(0.0, 2.0, 10.0);
    let strategy = TrustRegionStrategy::new(
        Box::new(GradientDescent::new()),
        Arc::new(DistanceConstraint::new(1.0)),
    );
    let mut trainer = IterativeTrainer::new(TrainerConfig::default().with_max_iterations(1))
        .with_orientation(Box::new(strategy));
    let summary = trainer.run(&mut subject)?;

    let w = weight.value().data()[0];
    assert!(w > 0.0 && w <= 1.0 + 1e-12);
    assert!(summary.final_value < summary.initial_value);
    assert_abs_diff_eq!(subject.measure()?.value(), (2.0 * w - 10.0).powi(2), epsilon = 1e-9);
    Ok(())
}
