//! One-step forward filtering over the two-slice network.
//!
//! Given the previous step's [`Posterior`] and the current [`Evidence`], nodes
//! are visited in topological order:
//!
//! 1. Observed nodes are clamped one-hot at the observed state.
//! 2. Nodes with a transition table and a previous posterior get a predicted
//!    distribution by contracting the previous marginals of their temporal
//!    parents against the transition table. Nodes that also have intra-slice
//!    parents multiply that prediction by the intra-slice conditional, computed
//!    from the parents' current-step posteriors, and renormalize.
//! 3. With a previous posterior, nodes without a transition table run static
//!    variable elimination on the evidence over their ancestors.
//! 4. Without a previous posterior every non-observed node uses static
//!    variable elimination on the full evidence.

use crate::engine::elimination::marginal;
use crate::engine::errors::ConfigurationError;
use crate::engine::evidence::{one_hot, Evidence, Posterior};
use crate::engine::factor::Factor;
use crate::engine::network::{previous_slice, Network, Node};

/// Totals at or below this are treated as zero when combining distributions.
const DEGENERATE_TOTAL: f64 = 1e-12;

/// Counts of how each node's posterior was produced in one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterDiagnostics {
    /// Nodes clamped to observed evidence.
    pub observed: usize,
    /// Nodes updated through their transition table.
    pub predicted: usize,
    /// Nodes answered by static variable elimination.
    pub static_inference: usize,
    /// Predictions whose product with the intra-slice conditional vanished.
    pub degenerate: usize,
}

/// Current-step posterior for every node.
pub fn forward_step(
    network: &Network,
    previous: Option<&Posterior>,
    evidence: &Evidence,
) -> Result<Posterior, ConfigurationError> {
    forward_step_with_diagnostics(network, previous, evidence).map(|(posterior, _)| posterior)
}

/// Current-step posterior for every node, with per-step diagnostics.
pub fn forward_step_with_diagnostics(
    network: &Network,
    previous: Option<&Posterior>,
    evidence: &Evidence,
) -> Result<(Posterior, FilterDiagnostics), ConfigurationError> {
    network.validate_evidence(evidence)?;
    let previous = previous.filter(|p| !p.is_empty());

    let mut posterior = Posterior::new();
    let mut diagnostics = FilterDiagnostics::default();

    for node in network.topological_order() {
        if let Some(state) = evidence.get(&node.name) {
            posterior.insert(node.name.clone(), one_hot(node.cardinality, state));
            diagnostics.observed += 1;
            continue;
        }

        let probabilities = match (network.transition_factor(&node.name), previous) {
            (Some(transition), Some(prev)) => {
                diagnostics.predicted += 1;
                let predicted = predict(network, node, transition, prev)?;
                if node.is_root() {
                    predicted
                } else {
                    let intra = intra_slice(network, node, &posterior, evidence)?;
                    match combine(&predicted, &intra) {
                        Some(combined) => combined,
                        None => {
                            diagnostics.degenerate += 1;
                            #[cfg(feature = "tracing")]
                            tracing::warn!(
                                node = %node.name,
                                "prediction vanished under intra-slice conditional; using conditional"
                            );
                            intra
                        }
                    }
                }
            }
            (None, Some(_)) => {
                diagnostics.static_inference += 1;
                let ancestors = ancestors(network, &node.name);
                let relevant = evidence.restricted_to(|name| ancestors.contains(&name));
                marginal(network, &node.name, &relevant)?
            }
            (_, None) => {
                diagnostics.static_inference += 1;
                marginal(network, &node.name, evidence)?
            }
        };
        posterior.insert(node.name.clone(), probabilities);
    }

    Ok((posterior, diagnostics))
}

/// `sum_{prev} P(node_t | prev) * P(prev)` over the node's temporal parents.
fn predict(
    network: &Network,
    node: &Node,
    transition: &Factor,
    previous: &Posterior,
) -> Result<Vec<f64>, ConfigurationError> {
    let mut predicted = transition.clone();
    for parent in node.temporal_parents() {
        let cardinality = network.cardinality(parent)?;
        let prior = match previous.get(parent) {
            Some(probs) if probs.len() == cardinality => probs.to_vec(),
            Some(probs) => {
                return Err(ConfigurationError::ShapeMismatch {
                    name: parent.to_string(),
                    expected: cardinality,
                    actual: probs.len(),
                })
            }
            None => vec![1.0 / cardinality as f64; cardinality],
        };
        let prev_name = previous_slice(parent);
        let prior = Factor::new([(prev_name.as_str(), cardinality)], prior)?;
        predicted = predicted.multiply(&prior)?.marginalize(&prev_name);
    }
    Ok(predicted.normalize().into_values())
}

/// `P(node | intra parents)` with observed parents sliced and the rest weighted
/// by their current-step posteriors.
fn intra_slice(
    network: &Network,
    node: &Node,
    current: &Posterior,
    evidence: &Evidence,
) -> Result<Vec<f64>, ConfigurationError> {
    let parents = node.intra_parents();
    let observed = evidence.restricted_to(|name| parents.contains(&name));
    let mut conditional = network.cpt_factor(&node.name)?.condition(&observed)?;

    for parent in parents.iter().filter(|p| !observed.contains(p)) {
        let weights = current
            .get(parent)
            .ok_or_else(|| ConfigurationError::UnknownVariable(parent.to_string()))?;
        let weights = Factor::new([(*parent, weights.len())], weights.to_vec())?;
        conditional = conditional.multiply(&weights)?.marginalize(parent);
    }
    Ok(conditional.normalize().into_values())
}

/// Elementwise product, renormalized; `None` when the product vanishes.
fn combine(predicted: &[f64], intra: &[f64]) -> Option<Vec<f64>> {
    let product: Vec<f64> = predicted.iter().zip(intra).map(|(a, b)| a * b).collect();
    let total: f64 = product.iter().sum();
    if total <= DEGENERATE_TOTAL || !total.is_finite() {
        return None;
    }
    Some(product.into_iter().map(|p| p / total).collect())
}

/// Transitive intra-slice parents of `name`.
fn ancestors<'a>(network: &'a Network, name: &str) -> Vec<&'a str> {
    let mut found: Vec<&'a str> = Vec::new();
    let mut frontier: Vec<&'a str> = network
        .node(name)
        .map(Node::intra_parents)
        .unwrap_or_default();
    while let Some(next) = frontier.pop() {
        if found.contains(&next) {
            continue;
        }
        found.push(next);
        if let Some(node) = network.node(next) {
            frontier.extend(node.intra_parents());
        }
    }
    found
}
