//! Root prior learning from discrete observation records.
//!
//! Only nodes without intra-slice parents are updated: each root's prior is
//! replaced by Laplace-smoothed (+1) state frequencies over the records that
//! observe it. Conditional tables of non-root nodes are left untouched; learning
//! them is not supported.

use crate::engine::errors::ConfigurationError;
use crate::engine::evidence::Evidence;
use crate::engine::network::{Cpt, Network};

/// New prior for one root node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RootUpdate {
    pub node: String,
    /// Records that observed this node.
    pub observations: usize,
    pub prior: Vec<f64>,
}

/// Outcome of [`learn_root_priors`].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LearningReport {
    pub records: usize,
    pub updated: Vec<RootUpdate>,
}

impl LearningReport {
    pub fn update_for(&self, node: &str) -> Option<&RootUpdate> {
        self.updated.iter().find(|u| u.node == node)
    }
}

/// Re-estimates every root prior from `records`.
///
/// All records are validated before anything is written; on error the network
/// is unchanged. A root that no record observes ends up uniform.
pub fn learn_root_priors(
    network: &mut Network,
    records: &[Evidence],
) -> Result<LearningReport, ConfigurationError> {
    for record in records {
        network.validate_evidence(record)?;
    }

    let mut updated = Vec::new();
    for root in network.roots() {
        let mut counts = vec![1.0; root.cardinality];
        let mut observations = 0;
        for state in records.iter().filter_map(|r| r.get(&root.name)) {
            counts[state] += 1.0;
            observations += 1;
        }
        let total: f64 = counts.iter().sum();
        updated.push(RootUpdate {
            node: root.name.clone(),
            observations,
            prior: counts.into_iter().map(|c| c / total).collect(),
        });
    }

    let mut learned = network.clone();
    for update in &updated {
        learned.replace_cpt(&update.node, Cpt::Prior(update.prior.clone()))?;
    }
    *network = learned;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "Learned {} root priors from {} records",
        updated.len(),
        records.len()
    );

    Ok(LearningReport {
        records: records.len(),
        updated,
    })
}
