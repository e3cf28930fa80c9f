//! Indicator disagreement and reliability-adjusted weighting.

use crate::fusion::mapping::{clamp_score, SCORE_MAX};
use crate::fusion::types::{ConflictDiagnosis, IndicatorKind, IndicatorSet, IndicatorWeights};

/// Normalized disagreement `|a - b| / 100` between two scores.
fn disagreement(a: f64, b: f64) -> f64 {
    (clamp_score(a) - clamp_score(b)).abs() / SCORE_MAX
}

/// Pairwise disagreement, conflict degree, and per-indicator reliability.
///
/// `threshold` must lie in `[0, 1)`; the configuration layer enforces this.
pub fn diagnose(readings: &IndicatorSet, threshold: f64) -> ConflictDiagnosis {
    let value = |kind: IndicatorKind| readings.get(kind).value;

    let mut max_diff: f64 = 0.0;
    for (i, a) in IndicatorKind::ALL.iter().enumerate() {
        for b in &IndicatorKind::ALL[i + 1..] {
            max_diff = max_diff.max(disagreement(value(*a), value(*b)));
        }
    }

    let is_conflict = max_diff > threshold;
    let degree = if is_conflict {
        ((max_diff - threshold) / (1.0 - threshold)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let reliabilities = IndicatorWeights::from_fn(|kind| {
        let others: Vec<f64> = IndicatorKind::ALL
            .iter()
            .filter(|&&other| other != kind)
            .map(|&other| 1.0 - disagreement(value(kind), value(other)))
            .collect();
        let agreement = others.iter().sum::<f64>() / others.len() as f64;
        readings.get(kind).confidence.clamp(0.0, 1.0) * (0.5 + 0.5 * agreement)
    });

    ConflictDiagnosis {
        is_conflict,
        degree,
        max_diff,
        reliabilities,
    }
}

/// Base weights outside conflict; otherwise `base * reliability`, renormalized.
///
/// Falls back to the base weights when every reliability is zero.
pub fn dynamic_weights(
    base: &IndicatorWeights,
    diagnosis: &ConflictDiagnosis,
) -> IndicatorWeights {
    if !diagnosis.is_conflict {
        return *base;
    }
    let adjusted =
        IndicatorWeights::from_fn(|kind| base.get(kind) * diagnosis.reliabilities.get(kind));
    let total = adjusted.sum();
    if total <= 0.0 || !total.is_finite() {
        return *base;
    }
    adjusted.map(|w| w / total)
}
