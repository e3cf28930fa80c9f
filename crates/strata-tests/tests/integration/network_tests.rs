use strata_core::engine::network::{
    ABUTMENT_STRESS, BURST_RISK, COMPOSITE_RISK, GEOLOGICAL_HAZARD, ROOF_STABILITY,
};
use strata_core::{
    enumerate_marginal, forward_step_with_diagnostics, learn_root_priors, marginal,
    variable_elimination, ConfigurationError, Cpt, Evidence, Network, Node,
};

/// Weather -> (Traffic, Umbrella); Traffic -> Late
fn commute() -> Network {
    Network::new(vec![
        Node::new("weather", 2, Cpt::Prior(vec![0.7, 0.3])).with_transition(Cpt::Conditional1 {
            parent: "weather".into(),
            columns: vec![vec![0.8, 0.2], vec![0.4, 0.6]],
        }),
        Node::new(
            "traffic",
            3,
            Cpt::Conditional1 {
                parent: "weather".into(),
                columns: vec![vec![0.6, 0.3, 0.1], vec![0.2, 0.4, 0.4]],
            },
        ),
        Node::new(
            "umbrella",
            2,
            Cpt::Conditional1 {
                parent: "weather".into(),
                columns: vec![vec![0.9, 0.1], vec![0.2, 0.8]],
            },
        ),
        Node::new(
            "late",
            2,
            Cpt::ConditionalN {
                parents: vec!["traffic".into()],
                table: vec![0.95, 0.7, 0.3, 0.05, 0.3, 0.7],
            },
        ),
    ])
    .unwrap()
}

#[test]
fn custom_network_matches_enumeration() {
    let network = commute();
    let evidence = Evidence::new().with("late", 1).with("umbrella", 0);
    for query in ["weather", "traffic"] {
        let ve = variable_elimination(&network, &[query], &evidence).unwrap();
        let bf = enumerate_marginal(&network, &[query], &evidence).unwrap();
        for (a, b) in ve.values().iter().zip(bf.values()) {
            assert!((a - b).abs() < 1e-12, "{query}: {a} vs {b}");
        }
    }
}

#[test]
fn joint_query_over_two_children_matches_enumeration() {
    let network = commute();
    let evidence = Evidence::new().with("late", 0);
    let ve = variable_elimination(&network, &["umbrella", "traffic"], &evidence).unwrap();
    let bf = enumerate_marginal(&network, &["umbrella", "traffic"], &evidence).unwrap();
    assert_eq!(ve.cardinalities(), &[2, 3]);
    for (a, b) in ve.values().iter().zip(bf.values()) {
        assert!((a - b).abs() < 1e-12);
    }
}

#[test]
fn filtering_mixes_static_and_temporal_nodes() {
    let network = commute();
    let (first, diagnostics) =
        forward_step_with_diagnostics(&network, None, &Evidence::new().with("umbrella", 1))
            .unwrap();
    assert_eq!(diagnostics.observed, 1);
    assert_eq!(diagnostics.static_inference, 3);

    let (second, diagnostics) =
        forward_step_with_diagnostics(&network, Some(&first), &Evidence::new()).unwrap();
    assert_eq!(diagnostics.predicted, 1);
    // traffic, umbrella, and late have no transition table
    assert_eq!(diagnostics.static_inference, 3);

    // weather_t = sum_prev P(weather_t | prev) * first[prev]
    let prev = first.get("weather").unwrap();
    let expected = [
        0.8 * prev[0] + 0.4 * prev[1],
        0.2 * prev[0] + 0.6 * prev[1],
    ];
    let weather = second.get("weather").unwrap();
    for (a, b) in weather.iter().zip(expected) {
        assert!((a - b).abs() < 1e-12);
    }
}

#[test]
fn replaced_prior_changes_inference() {
    let mut network = Network::mining_pressure().unwrap();
    network
        .replace_cpt(GEOLOGICAL_HAZARD, Cpt::Prior(vec![0.1, 0.1, 0.8]))
        .unwrap();
    let roof = marginal(&network, ROOF_STABILITY, &Evidence::new()).unwrap();
    // 0.1 [0.7, 0.25, 0.05] + 0.1 [0.3, 0.5, 0.2] + 0.8 [0.1, 0.3, 0.6]
    let expected = [0.18, 0.315, 0.505];
    for (a, b) in roof.iter().zip(expected) {
        assert!((a - b).abs() < 1e-12);
    }
}

#[test]
fn replacing_cpt_with_wrong_parent_is_rejected() {
    let mut network = Network::mining_pressure().unwrap();
    let err = network
        .replace_cpt(
            ROOF_STABILITY,
            Cpt::Conditional1 {
                parent: "seismic_energy".into(),
                columns: vec![vec![1.0, 0.0, 0.0]; 3],
            },
        )
        .unwrap_err();
    assert_eq!(err, ConfigurationError::UnknownVariable("seismic_energy".into()));
}

#[test]
fn learning_shifts_static_hazard_posterior() {
    let mut network = Network::mining_pressure().unwrap();
    let before = marginal(&network, GEOLOGICAL_HAZARD, &Evidence::new()).unwrap();
    let records: Vec<Evidence> = (0..9)
        .map(|_| Evidence::new().with(GEOLOGICAL_HAZARD, 2))
        .collect();
    let report = learn_root_priors(&mut network, &records).unwrap();
    assert_eq!(report.updated[0].observations, 9);

    let after = marginal(&network, GEOLOGICAL_HAZARD, &Evidence::new()).unwrap();
    // (1, 1, 10) / 12
    assert!((after[2] - 10.0 / 12.0).abs() < 1e-12);
    assert!(after[2] > before[2]);
}

#[test]
fn summary_reports_mining_structure() {
    let summary = Network::mining_pressure().unwrap().summary();
    assert_eq!(summary.topological_order[0], GEOLOGICAL_HAZARD);
    assert_eq!(summary.topological_order[4], COMPOSITE_RISK);
    let composite = summary
        .nodes
        .iter()
        .find(|n| n.name == COMPOSITE_RISK)
        .unwrap();
    assert_eq!(
        composite.intra_parents,
        [ROOF_STABILITY, BURST_RISK, ABUTMENT_STRESS]
    );
    assert!(composite.temporal_parents.is_empty());
}
