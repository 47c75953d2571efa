//! Property-based tests using proptest
//!
//! Invariants that must hold for every finite input, not just the scenarios
//! exercised elsewhere.

use proptest::prelude::*;
use ruvector_vitals::topology::{
    EmbeddingBuffer, PointCloudStore, ProjectedPoint, Projector, TopologicalScorer,
};
use ruvector_vitals::{
    AlertConfig, AlertLevel, AlertStabilizer, FastPathPolicy, FusionConfig, MonotoneSpline,
    PhysicsValidator, RiskFusion, VitalsSample,
};

// ============================================================================
// Strategies
// ============================================================================

fn default_fusion() -> RiskFusion {
    RiskFusion::new(&FusionConfig::default()).unwrap()
}

// Anything a broken monitor could emit, including wildly out-of-range values.
fn any_sample() -> impl Strategy<Value = VitalsSample> {
    (
        -1.0e6f64..1.0e6,
        -1.0e6f64..1.0e6,
        0.0f64..100.0,
        30.0f64..45.0,
        0.0f64..60.0,
    )
        .prop_map(|(hr, map, spo2, temp, rr)| {
            VitalsSample::new(0.0, hr, map, spo2, temp, rr).unwrap()
        })
}

fn cloud_strategy(dim: usize) -> impl Strategy<Value = Vec<ProjectedPoint>> {
    prop::collection::vec(prop::collection::vec(-50.0f64..50.0, dim), 2..25)
        .prop_map(|rows| rows.into_iter().map(ProjectedPoint::new).collect())
}

// ============================================================================
// Physics
// ============================================================================

proptest! {
    // Property: validation is total and severity stays in range
    #[test]
    fn test_validate_never_panics(sample in any_sample()) {
        let result = PhysicsValidator::default().validate(&sample);
        prop_assert!((0.0..=1.0).contains(&result.severity));
        if !result.is_valid {
            prop_assert_eq!(result.severity, 0.0);
        }
        prop_assert!(!result.reason.is_empty());
    }

    // Property: anything outside the hard bounds is invalid
    #[test]
    fn test_out_of_bounds_pressure_invalid(map in 300.001f64..1.0e5, hr in 10.0f64..300.0) {
        let sample = VitalsSample::new(0.0, hr, map, 98.0, 37.0, 16.0).unwrap();
        let result = PhysicsValidator::default().validate(&sample);
        prop_assert!(!result.is_valid);
        prop_assert!(result.reason.contains("pressure"));
    }
}

// ============================================================================
// Fusion
// ============================================================================

proptest! {
    // Property: risk is clipped to [0, 1] for any input
    #[test]
    fn test_risk_bounded(shape in -1.0e4f64..1.0e4, severity in -10.0f64..10.0) {
        let risk = default_fusion().predict(shape, severity).risk;
        prop_assert!((0.0..=1.0).contains(&risk));
    }

    // Property: more shape instability never lowers risk
    #[test]
    fn test_risk_monotone_in_shape(
        a in 0.0f64..10.0,
        b in 0.0f64..10.0,
        severity in 0.0f64..1.0
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let fusion = default_fusion();
        prop_assert!(fusion.predict(hi, severity).risk >= fusion.predict(lo, severity).risk - 1e-12);
    }

    // Property: healthier physics never raises risk
    #[test]
    fn test_risk_antitone_in_severity(
        shape in 0.0f64..6.0,
        a in 0.0f64..1.0,
        b in 0.0f64..1.0
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let fusion = default_fusion();
        prop_assert!(fusion.predict(shape, lo).risk >= fusion.predict(shape, hi).risk - 1e-12);
    }

    // Property: any non-decreasing coefficient set gives a non-decreasing curve
    #[test]
    fn test_spline_monotone_from_coefficients(
        steps in prop::collection::vec(0.0f64..1.0, 6..12),
        x in 0.0f64..1.0,
        dx in 0.0f64..1.0
    ) {
        let coefficients: Vec<f64> = steps
            .iter()
            .scan(0.0, |acc, step| { *acc += step; Some(*acc) })
            .collect();
        let degree = 3;
        let n = coefficients.len();
        let mut knots = vec![0.0; degree + 1];
        knots.extend((1..n - degree).map(|j| j as f64 / (n - degree) as f64));
        knots.extend(std::iter::repeat(1.0).take(degree + 1));

        let spline = MonotoneSpline::new(knots, coefficients, degree).unwrap();
        let y0 = spline.evaluate(x);
        let y1 = spline.evaluate((x + dx).min(1.0));
        prop_assert!(y1 >= y0 - 1e-9, "f({}) = {} > f({}) = {}", x, y0, x + dx, y1);
    }
}

// ============================================================================
// Topology
// ============================================================================

proptest! {
    // Property: the buffer emits nothing for W-1 pushes, then on every push
    #[test]
    fn test_buffer_emission_schedule(window in 1usize..12, pushes in 0usize..40) {
        let mut buffer = EmbeddingBuffer::new(window).unwrap();
        let sample = VitalsSample::new(0.0, 75.0, 90.0, 98.0, 37.0, 16.0).unwrap();
        for i in 0..pushes {
            let emitted = buffer.push(&sample);
            prop_assert_eq!(emitted.is_some(), i + 1 >= window);
            if let Some(embedding) = emitted {
                prop_assert_eq!(embedding.len(), window * 5);
            }
            prop_assert!(buffer.len() <= window);
        }
    }

    // Property: cloud never exceeds capacity and never re-enters calibration
    #[test]
    fn test_cloud_capacity_and_calibration(
        capacity in 2usize..20,
        points in prop::collection::vec(prop::collection::vec(-5.0f64..5.0, 3), 0..60)
    ) {
        let calibration_min = (capacity / 2).max(1);
        let mut cloud = PointCloudStore::new(capacity, calibration_min).unwrap();
        let scorer = TopologicalScorer::default();
        let mut ready = false;
        for coords in points {
            cloud.observe(ProjectedPoint::new(coords));
            prop_assert!(cloud.len() <= capacity);
            let reading = cloud.score(&scorer);
            if ready {
                prop_assert!(!reading.is_calibrating());
            }
            ready |= !reading.is_calibrating();
            prop_assert!(reading.score() >= 0.0);
        }
    }

    // Property: shape score scales linearly with the cloud
    #[test]
    fn test_score_homogeneous(cloud in cloud_strategy(4), scale in 0.1f64..10.0) {
        let scorer = TopologicalScorer::default();
        let scaled: Vec<ProjectedPoint> = cloud
            .iter()
            .map(|p| ProjectedPoint::new(p.coords.iter().map(|c| c * scale).collect()))
            .collect();
        let base = scorer.score(&cloud);
        let grown = scorer.score(&scaled);
        prop_assert!((grown - scale * base).abs() <= 1e-6 * (1.0 + grown.abs()));
    }

    // Property: same seed, same projection
    #[test]
    fn test_projection_deterministic(
        seed in any::<u64>(),
        input in prop::collection::vec(-100.0f64..100.0, 20..60)
    ) {
        let a = Projector::new(6, None, seed).unwrap();
        let b = Projector::new(6, None, seed).unwrap();
        prop_assert_eq!(a.fit_once(&input).unwrap(), b.fit_once(&input).unwrap());
    }
}

// ============================================================================
// Alerting
// ============================================================================

proptest! {
    // Property: SensorConcern is never masked, and held implies a Stable fast path
    #[test]
    fn test_stabilizer_masks_only_stable(
        steps in prop::collection::vec((0.0f64..1.0, any::<bool>(), 0.0f64..3.0), 1..60)
    ) {
        let policy = FastPathPolicy::default();
        let mut stabilizer = AlertStabilizer::new(&AlertConfig::default());
        let validator = PhysicsValidator::default();
        let fusion = default_fusion();
        let mut now = 0.0;

        for (shape_fraction, artifact, dt) in steps {
            now += dt;
            let map = if artifact { 350.0 } else { 90.0 };
            let sample = VitalsSample::new(now, 75.0, map, 98.0, 37.0, 16.0).unwrap();
            let physics = validator.validate(&sample);
            let risk = fusion.predict(shape_fraction * 5.0, physics.severity);
            let fast = policy.decide(&physics, &risk);
            let shown = stabilizer.update(&fast, None, now);

            if fast.level == AlertLevel::SensorConcern {
                prop_assert_eq!(shown.decision.level, AlertLevel::SensorConcern);
            }
            if shown.held {
                prop_assert_eq!(fast.level, AlertLevel::Stable);
                prop_assert!(shown.decision.level.is_escalated());
            }
            prop_assert_eq!(stabilizer.current_level(), shown.decision.level);
        }
    }
}
