//! Value types exchanged with the fusion engine.

use std::fmt;

use crate::engine::network::{ABUTMENT_STRESS, BURST_RISK, ROOF_STABILITY};

/// One of the three upstream risk indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum IndicatorKind {
    RoofStability,
    BurstRisk,
    AbutmentStress,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 3] = [
        IndicatorKind::RoofStability,
        IndicatorKind::BurstRisk,
        IndicatorKind::AbutmentStress,
    ];

    /// Network node the indicator is observed on.
    pub fn node(self) -> &'static str {
        match self {
            IndicatorKind::RoofStability => ROOF_STABILITY,
            IndicatorKind::BurstRisk => BURST_RISK,
            IndicatorKind::AbutmentStress => ABUTMENT_STRESS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IndicatorKind::RoofStability => "roof stability",
            IndicatorKind::BurstRisk => "burst risk",
            IndicatorKind::AbutmentStress => "abutment stress",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One value per indicator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerIndicator<T> {
    pub roof: T,
    pub burst: T,
    pub abutment: T,
}

impl<T> PerIndicator<T> {
    pub fn new(roof: T, burst: T, abutment: T) -> Self {
        Self {
            roof,
            burst,
            abutment,
        }
    }

    pub fn from_fn(mut f: impl FnMut(IndicatorKind) -> T) -> Self {
        Self {
            roof: f(IndicatorKind::RoofStability),
            burst: f(IndicatorKind::BurstRisk),
            abutment: f(IndicatorKind::AbutmentStress),
        }
    }

    pub fn get(&self, kind: IndicatorKind) -> &T {
        match kind {
            IndicatorKind::RoofStability => &self.roof,
            IndicatorKind::BurstRisk => &self.burst,
            IndicatorKind::AbutmentStress => &self.abutment,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PerIndicator<U> {
        PerIndicator {
            roof: f(&self.roof),
            burst: f(&self.burst),
            abutment: f(&self.abutment),
        }
    }

    /// `(kind, value)` pairs in [`IndicatorKind::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (IndicatorKind, &T)> + '_ {
        IndicatorKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }
}

impl PerIndicator<f64> {
    pub fn sum(&self) -> f64 {
        self.roof + self.burst + self.abutment
    }
}

/// Weights keyed by indicator.
pub type IndicatorWeights = PerIndicator<f64>;

/// The three indicator readings fused in one call.
pub type IndicatorSet = PerIndicator<IndicatorReading>;

/// A single indicator model's output.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndicatorReading {
    /// Safety score in `[0, 100]`; higher is safer.
    pub value: f64,
    /// Model confidence in `[0, 1]`.
    pub confidence: f64,
    #[cfg_attr(feature = "serde", serde(default = "full_range"))]
    pub uncertainty_range: (f64, f64),
}

fn full_range() -> (f64, f64) {
    (0.0, 100.0)
}

impl IndicatorReading {
    /// Reading with the uninformative `[0, 100]` uncertainty range.
    pub fn new(value: f64, confidence: f64) -> Self {
        Self {
            value,
            confidence,
            uncertainty_range: full_range(),
        }
    }

    pub fn with_range(mut self, low: f64, high: f64) -> Self {
        self.uncertainty_range = (low, high);
        self
    }
}

/// Discrete risk classification of a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        })
    }
}

/// How an assessment was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ComputationMethod {
    /// Forward filtering from the previous posterior.
    #[cfg_attr(feature = "serde", serde(rename = "dbn-temporal"))]
    Temporal,
    /// Single-slice variable elimination.
    #[cfg_attr(feature = "serde", serde(rename = "dbn-static"))]
    Static,
    /// Fixed-weight linear combination after inference failed.
    #[cfg_attr(feature = "serde", serde(rename = "dbn-fallback"))]
    Fallback,
}

impl ComputationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ComputationMethod::Temporal => "dbn-temporal",
            ComputationMethod::Static => "dbn-static",
            ComputationMethod::Fallback => "dbn-fallback",
        }
    }
}

impl fmt::Display for ComputationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disagreement among the three indicators.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConflictDiagnosis {
    pub is_conflict: bool,
    /// `0` when not in conflict, otherwise in `(0, 1]`.
    pub degree: f64,
    /// Largest pairwise `|a - b| / 100`.
    pub max_diff: f64,
    pub reliabilities: IndicatorWeights,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TrendDirection {
    /// Composite score falling.
    RisingRisk,
    /// Composite score rising.
    FallingRisk,
    Stable,
}

impl TrendDirection {
    pub fn label(self) -> &'static str {
        match self {
            TrendDirection::RisingRisk => "rising risk",
            TrendDirection::FallingRisk => "falling risk",
            TrendDirection::Stable => "stable",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Least-squares trend over recent composite scores.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrendReport {
    /// Score change per fusion step.
    pub slope: f64,
    pub direction: TrendDirection,
    /// Number of history entries in the fit.
    pub window: usize,
    /// Risk level of the newest entry.
    pub current_level: RiskLevel,
}

/// Output of one fusion call.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FusedAssessment {
    pub composite_score: f64,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub credible_interval: (f64, f64),
    /// Sums to one.
    pub weights: IndicatorWeights,
    pub recommendations: Vec<String>,
    pub conflict: ConflictDiagnosis,
    pub computation_method: ComputationMethod,
    /// Trend over history as it stood before this call.
    pub trend: Option<TrendReport>,
    /// Why inference was abandoned, when `computation_method` is `Fallback`.
    pub fallback_reason: Option<String>,
}

impl FusedAssessment {
    pub fn is_fallback(&self) -> bool {
        self.computation_method == ComputationMethod::Fallback
    }
}
