//! Fusion engine configuration.

use crate::engine::errors::ConfigurationError;
use crate::fusion::history::{DEFAULT_HISTORY_CAPACITY, MIN_TREND_POINTS};
use crate::fusion::types::{IndicatorKind, IndicatorWeights};

/// Tunables for [`FusionEngine`](crate::fusion::FusionEngine).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FusionConfig {
    /// Weights used when the indicators agree. Renormalized on validation.
    pub base_weights: IndicatorWeights,
    /// Largest pairwise disagreement tolerated before conflict, in [0, 1).
    pub conflict_threshold: f64,
    /// Confidence penalty per unit of conflict degree, in [0, 1].
    pub conflict_penalty_scale: f64,
    /// Indicator scores below this get their own recommendation.
    pub low_score_callout: f64,
    /// Posteriors retained for filtering and trend analysis.
    pub history_capacity: usize,
    /// Filter from the previous posterior; when false every call is static.
    pub use_temporal: bool,
    /// Newest entries fitted by the trend; all of history when `None`.
    pub trend_window: Option<usize>,
    /// Slope magnitude beyond which the trend is rising or falling.
    pub trend_slope_threshold: f64,
    /// Half width of the interval reported in fallback mode.
    pub fallback_half_width: f64,
    /// Confidence reported in fallback mode.
    pub fallback_confidence: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            base_weights: IndicatorWeights::new(0.40, 0.35, 0.25),
            conflict_threshold: 0.30,
            conflict_penalty_scale: 0.30,
            low_score_callout: 50.0,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            use_temporal: true,
            trend_window: None,
            trend_slope_threshold: 5.0,
            fallback_half_width: 10.0,
            fallback_confidence: 0.5,
        }
    }
}

impl FusionConfig {
    /// Default configuration with temporal filtering disabled.
    pub fn static_inference() -> Self {
        Self {
            use_temporal: false,
            ..Self::default()
        }
    }

    /// Checks every field and renormalizes `base_weights`.
    pub fn validate(self) -> Result<Self, ConfigurationError> {
        let base_weights = normalize_weights(self.base_weights)?;
        if !(0.0..1.0).contains(&self.conflict_threshold) {
            return Err(invalid("conflict_threshold must be in [0, 1)"));
        }
        if !(0.0..=1.0).contains(&self.conflict_penalty_scale) {
            return Err(invalid("conflict_penalty_scale must be in [0, 1]"));
        }
        if !self.low_score_callout.is_finite() {
            return Err(invalid("low_score_callout must be finite"));
        }
        if self.history_capacity == 0 {
            return Err(invalid("history_capacity must be > 0"));
        }
        if let Some(window) = self.trend_window {
            if window < MIN_TREND_POINTS {
                return Err(invalid(format!(
                    "trend_window must be at least {MIN_TREND_POINTS}"
                )));
            }
        }
        if self.trend_slope_threshold < 0.0 || !self.trend_slope_threshold.is_finite() {
            return Err(invalid("trend_slope_threshold must be finite and >= 0"));
        }
        if self.fallback_half_width < 0.0 || !self.fallback_half_width.is_finite() {
            return Err(invalid("fallback_half_width must be finite and >= 0"));
        }
        if !(0.0..=1.0).contains(&self.fallback_confidence) {
            return Err(invalid("fallback_confidence must be in [0, 1]"));
        }
        Ok(Self {
            base_weights,
            ..self
        })
    }
}

/// Rejects negative, non-finite, or all-zero weights and scales them to sum to one.
pub(crate) fn normalize_weights(
    weights: IndicatorWeights,
) -> Result<IndicatorWeights, ConfigurationError> {
    for kind in IndicatorKind::ALL {
        let weight = *weights.get(kind);
        if weight <= 0.0 || !weight.is_finite() {
            return Err(invalid(format!(
                "base weight for {kind} must be finite and > 0, got {weight}"
            )));
        }
    }
    let total = weights.sum();
    Ok(weights.map(|w| w / total))
}

fn invalid(message: impl Into<String>) -> ConfigurationError {
    ConfigurationError::InvalidConfig(message.into())
}
