//! Operator-facing recommendation text.

use crate::fusion::types::{
    ConflictDiagnosis, IndicatorKind, IndicatorSet, RiskLevel, TrendDirection, TrendReport,
};

pub const CONFLICT_TAG: &str = "[EVIDENCE CONFLICT]";
pub const DIAGNOSTIC_TAG: &str = "[DIAGNOSTIC]";
pub const TREND_TAG: &str = "[TREND]";

/// Inputs for [`recommendations`].
#[derive(Debug, Clone, Copy)]
pub struct RecommendationInput<'a> {
    pub risk_level: RiskLevel,
    pub readings: &'a IndicatorSet,
    pub conflict: &'a ConflictDiagnosis,
    pub trend: Option<&'a TrendReport>,
    /// Readings below this get an indicator-specific line.
    pub low_score_callout: f64,
}

/// Ordered lines: risk banner, low indicator callouts, conflict warning and
/// diagnostic, then trend.
pub fn recommendations(input: RecommendationInput<'_>) -> Vec<String> {
    let mut lines = vec![risk_banner(input.risk_level).to_string()];

    for (kind, reading) in input.readings.iter() {
        if reading.value < input.low_score_callout {
            lines.push(indicator_callout(kind).to_string());
        }
    }

    let conflict = input.conflict;
    if conflict.is_conflict {
        lines.push(format!(
            "{CONFLICT_TAG} Indicators disagree to a degree of {:.0}%; \
             verify monitoring data and check for geological anomalies",
            conflict.degree * 100.0
        ));
        let r = &conflict.reliabilities;
        lines.push(format!(
            "{DIAGNOSTIC_TAG} conflict degree {:.1}%, \
             reliability roof={:.2} burst={:.2} abutment={:.2}",
            conflict.degree * 100.0,
            r.roof,
            r.burst,
            r.abutment
        ));
    }

    if let Some(trend) = input.trend {
        lines.push(trend_line(trend));
    }
    lines
}

pub fn fallback_recommendations() -> Vec<String> {
    vec!["Fallback fusion used; manual review recommended".to_string()]
}

fn risk_banner(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => {
            "[HIGH RISK] Reinforce support immediately and consider suspending operations"
        }
        RiskLevel::Medium => {
            "[MEDIUM RISK] Increase monitoring frequency and prepare the emergency plan"
        }
        RiskLevel::Low => "[LOW RISK] Maintain routine monitoring and support",
    }
}

fn indicator_callout(kind: IndicatorKind) -> &'static str {
    match kind {
        IndicatorKind::RoofStability => {
            "Roof stability is poor: inspect the support system and consider denser props"
        }
        IndicatorKind::BurstRisk => {
            "Burst risk is elevated: apply destress blasting and limit extraction intensity"
        }
        IndicatorKind::AbutmentStress => {
            "Abutment stress is high: revise the extraction sequence to avoid high-stress zones"
        }
    }
}

fn trend_line(trend: &TrendReport) -> String {
    match trend.direction {
        TrendDirection::RisingRisk => format!(
            "{TREND_TAG} Risk rising quickly (slope {:.1} per step); stay alert",
            trend.slope
        ),
        TrendDirection::FallingRisk => format!(
            "{TREND_TAG} Risk gradually falling (slope {:.1} per step); keep current measures",
            trend.slope
        ),
        TrendDirection::Stable => format!("{TREND_TAG} Risk level relatively stable"),
    }
}
