//! End-to-end fusion scenarios on the mining template.

use strata_core::engine::network::COMPOSITE_RISK;
use strata_core::fusion::recommend::{CONFLICT_TAG, TREND_TAG};
use strata_core::{
    marginal, variable_elimination, ComputationMethod, ConfigurationError, Evidence,
    FusionEngine, IndicatorReading, IndicatorSet, Network, RiskLevel, TrendDirection,
};

fn assert_close(actual: f64, expected: f64, tol: f64, label: &str) {
    assert!(
        (actual - expected).abs() <= tol,
        "{} mismatch: expected {:.15}, got {:.15}, diff={:.3e}",
        label,
        expected,
        actual,
        (actual - expected).abs()
    );
}

fn readings(values: [f64; 3]) -> IndicatorSet {
    IndicatorSet::new(
        IndicatorReading::new(values[0], 0.85),
        IndicatorReading::new(values[1], 0.80),
        IndicatorReading::new(values[2], 0.82),
    )
}

#[test]
fn agreeing_safe_indicators_fuse_to_low_risk() {
    let mut engine = FusionEngine::mining_default().unwrap();
    let assessment = engine.fuse(&readings([75.0, 80.0, 70.0]));

    assert!(!assessment.conflict.is_conflict);
    assert_eq!(assessment.conflict.degree, 0.0);
    assert!((70.0..=100.0).contains(&assessment.composite_score));
    assert_close(assessment.composite_score, 72.4, 1e-9, "composite score");
    assert_eq!(assessment.risk_level, RiskLevel::Low);
    assert_eq!(assessment.computation_method, ComputationMethod::Static);
    assert_eq!(assessment.weights, engine.config().base_weights);
    assert!(assessment.fallback_reason.is_none());

    let (low, high) = assessment.credible_interval;
    assert!(low <= assessment.composite_score && assessment.composite_score <= high);
}

#[test]
fn disagreeing_indicators_are_flagged_as_conflict() {
    let mut engine = FusionEngine::mining_default().unwrap();
    let assessment = engine.fuse(&readings([80.0, 25.0, 75.0]));

    assert!(assessment.conflict.is_conflict);
    assert_close(assessment.conflict.max_diff, 0.55, 1e-12, "max diff");
    assert_close(assessment.conflict.degree, 0.357, 1e-3, "conflict degree");
    assert!(assessment
        .recommendations
        .iter()
        .any(|line| line.starts_with(CONFLICT_TAG)));

    assert_close(assessment.weights.sum(), 1.0, 1e-12, "weights sum");
    assert!(assessment.weights.burst < engine.config().base_weights.burst);

    // confidence = max(sink) * mean(confidence) * (1 - degree * 0.3)
    let expected = 0.90 * (0.85 + 0.80 + 0.82) / 3.0 * (1.0 - (0.25 / 0.7) * 0.3);
    assert_close(assessment.confidence, expected, 1e-9, "confidence");
}

#[test]
fn falling_scores_report_rising_risk() {
    let mut engine = FusionEngine::mining_default().unwrap();
    let mut assessments = Vec::new();
    for value in [80.0, 75.0, 60.0, 45.0, 30.0] {
        assessments.push(engine.fuse(&readings([value, value, value])));
        if engine.history().len() == 3 {
            let trend = engine.trend().unwrap();
            assert_eq!(trend.direction, TrendDirection::RisingRisk);
            assert_eq!(trend.direction.to_string(), "rising risk");
            assert_close(trend.slope, (53.5 - 72.4) / 2.0, 1e-9, "slope after three calls");
        }
    }

    assert_eq!(engine.history().len(), 5);
    assert_eq!(assessments[0].computation_method, ComputationMethod::Static);
    assert!(assessments[1..]
        .iter()
        .all(|a| a.computation_method == ComputationMethod::Temporal));

    // The first two calls have no trend; the fourth sees three prior entries.
    assert!(assessments[2].trend.is_none());
    let fourth = assessments[3].trend.unwrap();
    assert_eq!(fourth.direction, TrendDirection::RisingRisk);
    assert!(assessments[3]
        .recommendations
        .last()
        .unwrap()
        .starts_with(TREND_TAG));

    let scores: Vec<f64> = assessments.iter().map(|a| a.composite_score).collect();
    for (got, want) in scores.iter().zip([72.4, 72.4, 53.5, 53.5, 29.9]) {
        assert_close(*got, want, 1e-9, "composite score");
    }
    assert_eq!(assessments[4].risk_level, RiskLevel::High);
}

#[test]
fn unknown_query_variable_is_a_configuration_error() {
    let network = Network::mining_pressure().unwrap();
    assert_eq!(
        variable_elimination(&network, &["water_inrush"], &Evidence::new()).unwrap_err(),
        ConfigurationError::UnknownVariable("water_inrush".into())
    );
    assert!(matches!(
        marginal(
            &network,
            COMPOSITE_RISK,
            &Evidence::new().with("water_inrush", 0)
        ),
        Err(ConfigurationError::UnknownVariable(_))
    ));
}

#[test]
fn history_is_capped_at_capacity() {
    let mut engine = FusionEngine::mining_default().unwrap();
    for step in 0..25 {
        let value = 30.0 + (step % 5) as f64 * 10.0;
        engine.fuse(&readings([value, value, value]));
    }
    assert_eq!(engine.history().len(), 20);
    assert_eq!(engine.structure().history_length, 20);
}

#[test]
fn identical_inputs_and_history_give_identical_output() {
    let sequence = [
        [75.0, 80.0, 70.0],
        [80.0, 25.0, 75.0],
        [45.0, 50.0, 38.0],
        [f64::NAN, 50.0, 38.0],
        [20.0, 35.0, 30.0],
    ];
    let mut first = FusionEngine::mining_default().unwrap();
    let mut second = FusionEngine::mining_default().unwrap();
    for values in sequence {
        let a = first.fuse(&readings(values));
        let b = second.fuse(&readings(values));
        assert_eq!(a, b);
    }
    assert_eq!(first.history(), second.history());
}

#[test]
fn out_of_range_values_are_clamped_not_rejected() {
    let mut engine = FusionEngine::mining_default().unwrap();
    let assessment = engine.fuse(&readings([140.0, -20.0, 250.0]));
    assert!(!assessment.is_fallback());
    assert!((0.0..=100.0).contains(&assessment.composite_score));
    assert!(assessment.conflict.is_conflict);
    assert_close(assessment.conflict.max_diff, 1.0, 1e-12, "clamped max diff");
}
