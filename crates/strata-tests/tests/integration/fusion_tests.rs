use strata_core::engine::network::{
    ABUTMENT_STRESS, BURST_RISK, COMPOSITE_RISK, GEOLOGICAL_HAZARD, ROOF_STABILITY,
};
use strata_core::fusion::recommend::fallback_recommendations;
use strata_core::{
    ComputationMethod, ConfigurationError, Cpt, FusionConfig, FusionEngine, IndicatorReading,
    IndicatorSet, IndicatorWeights, Network, Node, RiskLevel, TrendDirection,
};

fn readings(values: [f64; 3]) -> IndicatorSet {
    IndicatorSet::new(
        IndicatorReading::new(values[0], 0.85),
        IndicatorReading::new(values[1], 0.80),
        IndicatorReading::new(values[2], 0.82),
    )
}

#[test]
fn fallback_uses_current_base_weights() {
    let mut engine = FusionEngine::mining_default().unwrap();
    engine
        .set_base_weights(IndicatorWeights::new(1.0, 1.0, 2.0))
        .unwrap();

    let assessment = engine.fuse(&readings([f64::NAN, 80.0, 60.0]));
    assert_eq!(assessment.computation_method, ComputationMethod::Fallback);
    assert_eq!(assessment.computation_method.to_string(), "dbn-fallback");
    // 0.25 * 50 + 0.25 * 80 + 0.5 * 60
    assert!((assessment.composite_score - 62.5).abs() < 1e-9);
    assert_eq!(assessment.risk_level, RiskLevel::Medium);
    assert_eq!(assessment.weights, IndicatorWeights::new(0.25, 0.25, 0.5));
    assert_eq!(assessment.recommendations, fallback_recommendations());
    assert!(assessment.trend.is_none());
    assert!(engine.history().is_empty());
}

#[test]
fn fallback_confidence_and_width_follow_config() {
    let config = FusionConfig {
        fallback_half_width: 5.0,
        fallback_confidence: 0.2,
        ..FusionConfig::default()
    };
    let mut engine = FusionEngine::new(Network::mining_pressure().unwrap(), config).unwrap();
    let assessment = engine.fuse(&readings([60.0, 60.0, f64::INFINITY]));
    // 0.40 * 60 + 0.35 * 60 + 0.25 * 50
    assert!((assessment.composite_score - 57.5).abs() < 1e-9);
    assert_eq!(assessment.confidence, 0.2);
    assert!((assessment.credible_interval.0 - 52.5).abs() < 1e-9);
    assert!((assessment.credible_interval.1 - 62.5).abs() < 1e-9);
}

#[test]
fn static_engine_repeats_identical_assessments() {
    let mut engine = FusionEngine::static_default().unwrap();
    let first = engine.fuse(&readings([75.0, 80.0, 70.0]));
    let second = engine.fuse(&readings([75.0, 80.0, 70.0]));
    assert_eq!(first.computation_method, ComputationMethod::Static);
    assert_eq!(first.composite_score, second.composite_score);
    assert_eq!(first.credible_interval, second.credible_interval);
    assert_eq!(engine.history().len(), 2);
}

#[test]
fn assessment_serializes_method_label_and_uppercase_level() {
    let mut engine = FusionEngine::mining_default().unwrap();
    let first = serde_json::to_value(engine.fuse(&readings([75.0, 80.0, 70.0]))).unwrap();
    let second = serde_json::to_value(engine.fuse(&readings([75.0, 80.0, 70.0]))).unwrap();

    assert_eq!(first["computation_method"], "dbn-static");
    assert_eq!(second["computation_method"], "dbn-temporal");
    assert_eq!(first["risk_level"], "LOW");
    assert_eq!(first["conflict"]["is_conflict"], false);
    assert!(first["fallback_reason"].is_null());
    assert_eq!(first["credible_interval"].as_array().unwrap().len(), 2);
}

#[test]
fn trend_window_limits_fit_to_recent_calls() {
    let config = FusionConfig {
        trend_window: Some(3),
        ..FusionConfig::default()
    };
    let mut windowed = FusionEngine::new(Network::mining_pressure().unwrap(), config).unwrap();
    let mut full = FusionEngine::mining_default().unwrap();
    for values in [[30.0; 3], [80.0; 3], [80.0; 3], [80.0; 3]] {
        windowed.fuse(&readings(values));
        full.fuse(&readings(values));
    }

    let recent = windowed.trend().unwrap();
    assert_eq!(recent.window, 3);
    assert_eq!(recent.direction, TrendDirection::Stable);
    assert!(recent.slope.abs() < 1e-9);
    assert_eq!(recent.current_level, RiskLevel::Low);

    let overall = full.trend().unwrap();
    assert_eq!(overall.window, 4);
    assert_eq!(overall.direction, TrendDirection::FallingRisk);
}

#[test]
fn replaced_composite_table_drives_the_score() {
    let mut engine = FusionEngine::mining_default().unwrap();
    // every parent assignment maps to high risk
    let mut table = vec![0.0; 81];
    for slot in &mut table[54..] {
        *slot = 1.0;
    }
    engine
        .replace_cpt(
            COMPOSITE_RISK,
            Cpt::ConditionalN {
                parents: vec![
                    ROOF_STABILITY.to_string(),
                    BURST_RISK.to_string(),
                    ABUTMENT_STRESS.to_string(),
                ],
                table,
            },
        )
        .unwrap();

    let assessment = engine.fuse(&readings([80.0, 80.0, 80.0]));
    assert!((assessment.composite_score - 25.0).abs() < 1e-9);
    assert_eq!(assessment.risk_level, RiskLevel::High);
    assert!((assessment.credible_interval.0 - 25.0).abs() < 1e-9);
    assert!((assessment.credible_interval.1 - 25.0).abs() < 1e-9);
}

#[test]
fn rejected_cpt_leaves_engine_usable() {
    let mut engine = FusionEngine::mining_default().unwrap();
    assert!(engine
        .replace_cpt(GEOLOGICAL_HAZARD, Cpt::Prior(vec![0.5, 0.5]))
        .is_err());
    let assessment = engine.fuse(&readings([75.0, 80.0, 70.0]));
    assert!(!assessment.is_fallback());
    assert!((assessment.composite_score - 72.4).abs() < 1e-9);
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let config = FusionConfig {
        conflict_threshold: 1.5,
        ..FusionConfig::default()
    };
    assert!(matches!(
        FusionEngine::new(Network::mining_pressure().unwrap(), config),
        Err(ConfigurationError::InvalidConfig(_))
    ));
}

#[test]
fn binary_composite_is_a_cardinality_mismatch() {
    let prior = || Cpt::Prior(vec![0.3, 0.4, 0.3]);
    let network = Network::new(vec![
        Node::new(ROOF_STABILITY, 3, prior()),
        Node::new(BURST_RISK, 3, prior()),
        Node::new(ABUTMENT_STRESS, 3, prior()),
        Node::new(COMPOSITE_RISK, 2, Cpt::Prior(vec![0.5, 0.5])),
    ])
    .unwrap();
    assert_eq!(
        FusionEngine::new(network, FusionConfig::default()).unwrap_err(),
        ConfigurationError::CardinalityMismatch {
            variable: COMPOSITE_RISK.to_string(),
            left: 2,
            right: 3,
        }
    );
}
