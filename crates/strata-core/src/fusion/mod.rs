//! # Indicator fusion
//!
//! [`FusionEngine`] turns three continuous indicator readings into one
//! composite risk assessment:
//!
//! 1. Diagnose disagreement between the readings and discretize them into
//!    evidence on the indicator nodes.
//! 2. Filter forward from the newest posterior in the engine's history, or run
//!    static inference when there is none (or temporal mode is off).
//! 3. Read the composite score, credible interval, and confidence off the sink
//!    node's posterior; classify the risk level; weight the indicators.
//! 4. Build recommendations and append the posterior to the history.
//!
//! [`FusionEngine::try_fuse`] reports failures as [`FusionError`].
//! [`FusionEngine::fuse`] never fails: it degrades to a fixed-weight linear
//! combination tagged [`ComputationMethod::Fallback`] and leaves the history
//! untouched.
//!
//! History is owned by the engine instance. Callers sharing one engine across
//! threads must serialize `fuse` calls themselves.

pub mod config;
pub mod conflict;
pub mod history;
pub mod mapping;
pub mod recommend;
pub mod types;

use crate::engine::errors::{ConfigurationError, FusionError};
use crate::engine::evidence::{Evidence, Posterior};
use crate::engine::filtering::forward_step;
use crate::engine::learning::{learn_root_priors, LearningReport};
use crate::engine::network::{Cpt, Network, NetworkSummary, COMPOSITE_RISK, RISK_STATES};

use self::config::{normalize_weights, FusionConfig};
use self::conflict::{diagnose, dynamic_weights};
use self::history::FusionHistory;
use self::mapping::{clamp_score, credible_interval, risk_level, state_to_value, value_to_state};
use self::recommend::{fallback_recommendations, recommendations, RecommendationInput};
use self::types::{
    ComputationMethod, FusedAssessment, IndicatorKind, IndicatorReading, IndicatorSet,
    IndicatorWeights, TrendReport,
};

/// Structural report for a fusion engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineStructure {
    pub network: NetworkSummary,
    pub history_length: usize,
    pub history_capacity: usize,
    pub use_temporal: bool,
}

/// Stateful fusion of indicator readings over a two-slice network.
#[derive(Debug, Clone)]
pub struct FusionEngine {
    network: Network,
    config: FusionConfig,
    history: FusionHistory,
}

impl FusionEngine {
    /// Validates `config` and checks that `network` carries the indicator and
    /// composite nodes with three states each.
    pub fn new(network: Network, config: FusionConfig) -> Result<Self, ConfigurationError> {
        let config = config.validate()?;
        let required = IndicatorKind::ALL
            .iter()
            .map(|kind| kind.node())
            .chain(std::iter::once(COMPOSITE_RISK));
        for name in required {
            let cardinality = network.cardinality(name)?;
            if cardinality != RISK_STATES {
                return Err(ConfigurationError::CardinalityMismatch {
                    variable: name.to_string(),
                    left: cardinality,
                    right: RISK_STATES,
                });
            }
        }
        Ok(Self {
            network,
            history: FusionHistory::with_capacity(config.history_capacity),
            config,
        })
    }

    /// Mining template with temporal filtering.
    pub fn mining_default() -> Result<Self, ConfigurationError> {
        Self::new(Network::mining_pressure()?, FusionConfig::default())
    }

    /// Mining template with static inference on every call.
    pub fn static_default() -> Result<Self, ConfigurationError> {
        Self::new(Network::mining_pressure()?, FusionConfig::static_inference())
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn history(&self) -> &FusionHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Trend over the current history, if it holds enough entries.
    pub fn trend(&self) -> Option<TrendReport> {
        self.history
            .trend(self.config.trend_window, self.config.trend_slope_threshold)
    }

    pub fn structure(&self) -> EngineStructure {
        EngineStructure {
            network: self.network.summary(),
            history_length: self.history.len(),
            history_capacity: self.history.capacity(),
            use_temporal: self.config.use_temporal,
        }
    }

    /// Replaces the non-conflict weights; they are renormalized to sum to one.
    pub fn set_base_weights(
        &mut self,
        weights: IndicatorWeights,
    ) -> Result<(), ConfigurationError> {
        self.config.base_weights = normalize_weights(weights)?;
        Ok(())
    }

    /// Swaps one node's intra-slice CPT. The engine is unchanged on error.
    pub fn replace_cpt(&mut self, node: &str, cpt: Cpt) -> Result<(), ConfigurationError> {
        self.network.replace_cpt(node, cpt)
    }

    /// Re-estimates root priors from discrete records.
    pub fn learn_parameters(
        &mut self,
        records: &[Evidence],
    ) -> Result<LearningReport, ConfigurationError> {
        learn_root_priors(&mut self.network, records)
    }

    /// Fuses one set of readings, falling back to a fixed-weight combination
    /// if inference fails.
    pub fn fuse(&mut self, readings: &IndicatorSet) -> FusedAssessment {
        match self.try_fuse(readings) {
            Ok(assessment) => assessment,
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %err, "fusion failed; using fixed-weight fallback");
                self.fallback(readings, err.to_string())
            }
        }
    }

    /// Fuses one set of readings; the history is only extended on success.
    pub fn try_fuse(&mut self, readings: &IndicatorSet) -> Result<FusedAssessment, FusionError> {
        check_finite(readings)?;

        let conflict = diagnose(readings, self.config.conflict_threshold);
        let evidence: Evidence = readings
            .iter()
            .map(|(kind, reading)| (kind.node(), value_to_state(reading.value)))
            .collect();

        let previous = if self.config.use_temporal {
            self.history.latest()
        } else {
            None
        };
        let method = if previous.is_some() {
            ComputationMethod::Temporal
        } else {
            ComputationMethod::Static
        };
        let posterior = forward_step(&self.network, previous, &evidence)?;

        let sink = sink_distribution(&posterior)?;
        let composite_score = state_to_value(sink);
        let credible_interval = credible_interval(sink);
        let risk_level = risk_level(composite_score);

        let mean_confidence = readings
            .iter()
            .map(|(_, r)| r.confidence.clamp(0.0, 1.0))
            .sum::<f64>()
            / IndicatorKind::ALL.len() as f64;
        let conflict_penalty = if conflict.is_conflict {
            conflict.degree * self.config.conflict_penalty_scale
        } else {
            0.0
        };
        let peak = sink.iter().copied().fold(0.0, f64::max);
        let confidence = peak * mean_confidence * (1.0 - conflict_penalty);

        let weights = dynamic_weights(&self.config.base_weights, &conflict);
        let trend = self.trend();
        let recommendations = recommendations(RecommendationInput {
            risk_level,
            readings,
            conflict: &conflict,
            trend: trend.as_ref(),
            low_score_callout: self.config.low_score_callout,
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(
            method = %method,
            evidence = ?evidence,
            composite_score,
            "Fused indicator readings"
        );

        self.history.push(posterior);

        Ok(FusedAssessment {
            composite_score,
            risk_level,
            confidence,
            credible_interval,
            weights,
            recommendations,
            conflict,
            computation_method: method,
            trend,
            fallback_reason: None,
        })
    }

    fn fallback(&self, readings: &IndicatorSet, reason: String) -> FusedAssessment {
        let sanitized = readings.map(|r| IndicatorReading {
            value: if r.value.is_finite() {
                clamp_score(r.value)
            } else {
                50.0
            },
            confidence: if r.confidence.is_finite() {
                r.confidence.clamp(0.0, 1.0)
            } else {
                0.0
            },
            uncertainty_range: r.uncertainty_range,
        });

        let weights = self.config.base_weights;
        let composite_score = clamp_score(
            sanitized
                .iter()
                .map(|(kind, r)| weights.get(kind) * r.value)
                .sum::<f64>(),
        );
        let half_width = self.config.fallback_half_width;

        FusedAssessment {
            composite_score,
            risk_level: risk_level(composite_score),
            confidence: self.config.fallback_confidence,
            credible_interval: (
                clamp_score(composite_score - half_width),
                clamp_score(composite_score + half_width),
            ),
            weights,
            recommendations: fallback_recommendations(),
            conflict: diagnose(&sanitized, self.config.conflict_threshold),
            computation_method: ComputationMethod::Fallback,
            trend: None,
            fallback_reason: Some(reason),
        }
    }
}

fn check_finite(readings: &IndicatorSet) -> Result<(), FusionError> {
    for (kind, reading) in readings.iter() {
        if !reading.value.is_finite() || !reading.confidence.is_finite() {
            return Err(FusionError::Numerical(format!(
                "{kind} reading is not finite (value {}, confidence {})",
                reading.value, reading.confidence
            )));
        }
    }
    Ok(())
}

fn sink_distribution(posterior: &Posterior) -> Result<&[f64], FusionError> {
    let sink = posterior.get(COMPOSITE_RISK).ok_or_else(|| {
        FusionError::Internal(format!("posterior has no '{COMPOSITE_RISK}' marginal"))
    })?;
    let total: f64 = sink.iter().sum();
    if !total.is_finite() || (total - 1.0).abs() > 1e-6 {
        return Err(FusionError::Numerical(format!(
            "'{COMPOSITE_RISK}' marginal sums to {total}"
        )));
    }
    Ok(sink)
}
