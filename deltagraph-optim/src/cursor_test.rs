use super::*;
use crate::monitor::RecordingMonitor;
use crate::test_support::scalar_regression;
use crate::trust_region::DistanceConstraint;
use approx::assert_abs_diff_eq;

fn steepest(origin: &PointSample) -> DeltaSet {
    origin.delta().scale(-1.0)
}

#[test]
fn test_origin_probe_reuses_measurement() -> Result<(), OptimError> {
    let (_, mut subject) = scalar_regression(0.0, 2.0, 10.0);
    let origin = subject.measure()?;
    assert_abs_diff_eq!(origin.value(), 100.0, epsilon = 1e-12);
    let direction = steepest(&origin);
    let mut cursor = SimpleLineSearchCursor::new(&mut subject, origin, direction, "GradientDescent");
    let mut monitor = RecordingMonitor::default();

    let probe = cursor.step(0.0, &mut monitor)?;
    assert_abs_diff_eq!(probe.value(), 100.0, epsilon = 1e-12);
    // gradient -40, direction 40
    assert_abs_diff_eq!(probe.derivative, -1600.0, epsilon = 1e-9);
    assert!(monitor.lines.is_empty());
    Ok(())
}

#[test]
fn test_step_moves_from_origin_every_time() -> Result<(), OptimError> {
    let (weight, mut subject) = scalar_regression(0.0, 2.0, 10.0);
    let origin = subject.measure()?;
    let direction = steepest(&origin);
    let mut cursor = SimpleLineSearchCursor::new(&mut subject, origin, direction, "GradientDescent");
    let mut monitor = RecordingMonitor::default();

    let first = cursor.step(0.125, &mut monitor)?;
    assert_abs_diff_eq!(weight.value().data()[0], 5.0, epsilon = 1e-12);
    assert_abs_diff_eq!(first.value(), 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(first.derivative, 0.0, epsilon = 1e-9);
    assert_eq!(first.rate(), 0.125);

    // probes are relative to the origin, not the previous probe
    let second = cursor.step(0.25, &mut monitor)?;
    assert_abs_diff_eq!(weight.value().data()[0], 10.0, epsilon = 1e-12);
    assert_abs_diff_eq!(second.value(), 100.0, epsilon = 1e-12);
    assert!(second.derivative > 0.0);

    cursor.reset()?;
    assert_eq!(weight.value().data()[0], 0.0);
    assert_eq!(monitor.lines.len(), 2);
    Ok(())
}

#[test]
fn test_trust_region_limits_step_and_derivative() -> Result<(), OptimError> {
    let (weight, mut subject) = scalar_regression(0.0, 2.0, 10.0);
    let origin = subject.measure()?;
    let direction = steepest(&origin);
    let mut cursor = SimpleLineSearchCursor::new(&mut subject, origin, direction, "GradientDescent")
        .with_trust_region(Arc::new(DistanceConstraint::new(1.0)));
    let mut monitor = RecordingMonitor::default();

    let probe = cursor.step(1.0, &mut monitor)?;
    assert_abs_diff_eq!(weight.value().data()[0], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(probe.value(), 64.0, epsilon = 1e-12);
    // effective direction is 1 per unit rate; gradient at w = 1 is 4 * (2 - 10)
    assert_abs_diff_eq!(probe.derivative, -32.0, epsilon = 1e-9);
    Ok(())
}

#[test]
fn test_failsafe_tracks_best_point() -> Result<(), OptimError> {
    let (weight, mut subject) = scalar_regression(0.0, 2.0, 10.0);
    let origin = subject.measure()?;
    let direction = steepest(&origin);
    let inner = SimpleLineSearchCursor::new(&mut subject, origin, direction, "GradientDescent");
    let mut cursor = FailsafeLineSearchCursor::new(Box::new(inner));
    let mut monitor = RecordingMonitor::default();

    cursor.step(0.5, &mut monitor)?; // w = 20, loss 900
    assert_abs_diff_eq!(cursor.best().value(), 100.0, epsilon = 1e-12);
    cursor.step(0.1, &mut monitor)?; // w = 4, loss 4
    cursor.step(1.0, &mut monitor)?; // w = 40, loss 4900
    assert_eq!(monitor.minima.len(), 1);

    let best = cursor.into_best();
    assert_eq!(best.rate(), 0.1);
    best.restore()?;
    assert_abs_diff_eq!(weight.value().data()[0], 4.0, epsilon = 1e-12);
    Ok(())
}
