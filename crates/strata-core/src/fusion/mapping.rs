//! Conversions between continuous scores and discrete risk states.
//!
//! State 0 is low risk (high safety score), state 2 is high risk. Scores and
//! interval bounds are always clamped to `[0, 100]`.

use crate::fusion::types::RiskLevel;

/// Representative score for each state.
pub const STATE_ANCHORS: [f64; 3] = [75.0, 55.0, 25.0];

/// Scores at or above this are low risk.
pub const LOW_RISK_FLOOR: f64 = 70.0;

/// Scores at or above this (and below [`LOW_RISK_FLOOR`]) are medium risk.
pub const MEDIUM_RISK_FLOOR: f64 = 40.0;

/// Two-sided 95% normal quantile.
const Z_95: f64 = 1.96;

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

pub fn clamp_score(value: f64) -> f64 {
    value.clamp(SCORE_MIN, SCORE_MAX)
}

/// Discretizes a score after clamping it into range.
pub fn value_to_state(value: f64) -> usize {
    let value = clamp_score(value);
    if value >= LOW_RISK_FLOOR {
        0
    } else if value >= MEDIUM_RISK_FLOOR {
        1
    } else {
        2
    }
}

/// Expected score under `probs`.
pub fn state_to_value(probs: &[f64]) -> f64 {
    clamp_score(expected_anchor(probs))
}

/// Mean ± 1.96 standard deviations of the anchor distribution.
pub fn credible_interval(probs: &[f64]) -> (f64, f64) {
    let mean = expected_anchor(probs);
    let variance: f64 = probs
        .iter()
        .zip(STATE_ANCHORS)
        .map(|(p, anchor)| p * (anchor - mean).powi(2))
        .sum();
    let half_width = Z_95 * variance.max(0.0).sqrt();
    (clamp_score(mean - half_width), clamp_score(mean + half_width))
}

pub fn risk_level(score: f64) -> RiskLevel {
    match value_to_state(score) {
        0 => RiskLevel::Low,
        1 => RiskLevel::Medium,
        _ => RiskLevel::High,
    }
}

fn expected_anchor(probs: &[f64]) -> f64 {
    probs.iter().zip(STATE_ANCHORS).map(|(p, anchor)| p * anchor).sum()
}
