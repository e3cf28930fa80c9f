//! JSON input shapes accepted by the `strata` command line.

use strata_core::engine::network::{GEOLOGICAL_HAZARD, ROOF_STABILITY};
use strata_core::{
    ConfigurationError, Evidence, FusionConfig, FusionEngine, IndicatorSet, IndicatorWeights,
    Network,
};

const READINGS: &str = r#"[
    {
        "roof": {"value": 75, "confidence": 0.85},
        "burst": {"value": 80, "confidence": 0.80, "uncertainty_range": [70, 90]},
        "abutment": {"value": 70, "confidence": 0.82}
    },
    {
        "roof": {"value": 45, "confidence": 0.7},
        "burst": {"value": 50, "confidence": 0.75},
        "abutment": {"value": 38, "confidence": 0.8}
    }
]"#;

#[test]
fn indicator_sets_parse_with_default_range() {
    let sets: Vec<IndicatorSet> = serde_json::from_str(READINGS).unwrap();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].roof.value, 75.0);
    assert_eq!(sets[0].roof.uncertainty_range, (0.0, 100.0));
    assert_eq!(sets[0].burst.uncertainty_range, (70.0, 90.0));
    assert_eq!(sets[1].abutment.confidence, 0.8);

    let mut engine = FusionEngine::mining_default().unwrap();
    let assessments: Vec<_> = sets.iter().map(|set| engine.fuse(set)).collect();
    assert!(assessments.iter().all(|a| !a.is_fallback()));
    assert_eq!(engine.history().len(), 2);
}

#[test]
fn missing_indicator_is_a_parse_error() {
    let source = r#"[{"roof": {"value": 75, "confidence": 0.85}}]"#;
    assert!(serde_json::from_str::<Vec<IndicatorSet>>(source).is_err());
}

#[test]
fn evidence_records_feed_learning() {
    let source = format!(
        r#"[{{"{GEOLOGICAL_HAZARD}": 0}}, {{"{GEOLOGICAL_HAZARD}": 0, "{ROOF_STABILITY}": 1}}, {{"{ROOF_STABILITY}": 2}}]"#
    );
    let records: Vec<Evidence> = serde_json::from_str(&source).unwrap();
    assert_eq!(records[1].get(ROOF_STABILITY), Some(1));

    let mut engine = FusionEngine::mining_default().unwrap();
    let report = engine.learn_parameters(&records).unwrap();
    assert_eq!(report.records, 3);
    let hazard = report.update_for(GEOLOGICAL_HAZARD).unwrap();
    assert_eq!(hazard.observations, 2);
    // (3, 1, 1) / 5
    let expected = [0.6, 0.2, 0.2];
    for (got, want) in hazard.prior.iter().zip(expected) {
        assert!((got - want).abs() < 1e-12);
    }
}

#[test]
fn out_of_range_record_rejects_whole_batch() {
    let records: Vec<Evidence> =
        serde_json::from_str(r#"[{"geological_hazard": 1}, {"geological_hazard": 7}]"#).unwrap();
    let mut engine = FusionEngine::mining_default().unwrap();
    let before = engine.network().node(GEOLOGICAL_HAZARD).unwrap().cpt.clone();
    assert!(matches!(
        engine.learn_parameters(&records),
        Err(ConfigurationError::StateOutOfRange { state: 7, .. })
    ));
    assert_eq!(engine.network().node(GEOLOGICAL_HAZARD).unwrap().cpt, before);
}

#[test]
fn partial_config_fills_defaults_and_renormalizes() {
    let config: FusionConfig = serde_json::from_str(
        r#"{"base_weights": {"roof": 2, "burst": 1, "abutment": 1}, "use_temporal": false}"#,
    )
    .unwrap();
    assert!(!config.use_temporal);
    assert_eq!(config.history_capacity, FusionConfig::default().history_capacity);

    let engine = FusionEngine::new(Network::mining_pressure().unwrap(), config).unwrap();
    assert_eq!(
        engine.config().base_weights,
        IndicatorWeights::new(0.5, 0.25, 0.25)
    );
    assert!(!engine.structure().use_temporal);
}

#[test]
fn structure_serializes_node_summaries() {
    let engine = FusionEngine::mining_default().unwrap();
    let json = serde_json::to_value(engine.structure()).unwrap();
    assert_eq!(json["history_capacity"], 20);
    assert_eq!(json["network"]["nodes"].as_array().unwrap().len(), 5);
    assert_eq!(json["network"]["topological_order"][0], GEOLOGICAL_HAZARD);
}
