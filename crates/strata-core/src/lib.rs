//! # Strata Core
//!
//! Exact inference over a two-slice discrete network and the indicator fusion
//! engine built on it.

pub mod engine;
pub mod fusion;

// Re-export commonly used types
pub use engine::elimination::{enumerate_marginal, marginal, variable_elimination};
pub use engine::errors::{ConfigurationError, FusionError};
pub use engine::evidence::{Evidence, Posterior};
pub use engine::factor::Factor;
pub use engine::filtering::{forward_step, forward_step_with_diagnostics, FilterDiagnostics};
pub use engine::learning::{learn_root_priors, LearningReport, RootUpdate};
pub use engine::network::{Cpt, Network, NetworkSummary, Node, NodeSummary};
pub use fusion::config::FusionConfig;
pub use fusion::history::FusionHistory;
pub use fusion::types::{
    ComputationMethod, ConflictDiagnosis, FusedAssessment, IndicatorKind, IndicatorReading,
    IndicatorSet, IndicatorWeights, PerIndicator, RiskLevel, TrendDirection, TrendReport,
};
pub use fusion::{EngineStructure, FusionEngine};
