//! Error types for strata inference and fusion.

use thiserror::Error;

/// Malformed network, query, evidence, or configuration.
///
/// These indicate a programming or configuration defect rather than a runtime
/// condition, so they are never retried and never swallowed by the fusion
/// fallback path when raised at construction time.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// A query, evidence map, or parent list names a variable the network does not have.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// A variable appears twice where names must be unique.
    #[error("duplicate variable '{0}'")]
    DuplicateVariable(String),

    /// An observed state index is outside `[0, cardinality)`.
    #[error("state {state} out of range for '{variable}' (cardinality {cardinality})")]
    StateOutOfRange {
        variable: String,
        state: usize,
        cardinality: usize,
    },

    /// Two factors disagree about a shared variable's cardinality.
    #[error("cardinality mismatch for '{variable}': {left} vs {right}")]
    CardinalityMismatch {
        variable: String,
        left: usize,
        right: usize,
    },

    /// A table's length or declared shape does not match its variables.
    #[error("shape mismatch for '{name}': expected {expected} entries, got {actual}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A CPT column does not sum to one, or holds a negative/non-finite entry.
    #[error("invalid probabilities for '{node}': {reason}")]
    InvalidProbabilities { node: String, reason: String },

    /// Intra-slice parentage forms a cycle.
    #[error("intra-slice structure is cyclic at '{0}'")]
    CyclicNetwork(String),

    /// A query named no variables.
    #[error("query must name at least one variable")]
    EmptyQuery,

    /// A fusion configuration field is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised while running a single fusion call.
///
/// `FusionEngine::fuse` converts every one of these into a fallback assessment;
/// `FusionEngine::try_fuse` returns them directly.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FusionError {
    /// Network, query, or evidence defect surfaced during inference.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Non-finite input or a posterior that cannot be normalized.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Internal invariant broken (programmer error, not user error).
    #[error("internal error: {0}")]
    Internal(String),
}
