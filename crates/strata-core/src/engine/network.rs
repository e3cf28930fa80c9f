//! # Two-slice discrete network
//!
//! A [`Network`] is a template of discrete nodes replicated across two adjacent
//! time slices. Each node carries:
//!
//! - an intra-slice CPT `P(node | intra parents)` stored as a [`Cpt`]
//! - an optional transition CPT `P(node_t | temporal parents_{t-1})`
//!
//! Every CPT stores its parent names next to the table, so axis order is never
//! inferred. Tables are validated against declared cardinalities and the
//! column-sum invariant when the network is built, and the corresponding
//! factors are cached for inference.
//!
//! [`Network::mining_pressure`] builds the five-node mining template: one
//! geological hazard root feeding roof stability, burst risk, and abutment
//! stress, which in turn feed the memoryless composite risk sink.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::engine::errors::ConfigurationError;
use crate::engine::evidence::Evidence;
use crate::engine::factor::Factor;

/// Cardinality used across the mining template: 0 = low risk, 1 = medium, 2 = high.
pub const RISK_STATES: usize = 3;

pub const GEOLOGICAL_HAZARD: &str = "geological_hazard";
pub const ROOF_STABILITY: &str = "roof_stability";
pub const BURST_RISK: &str = "burst_risk";
pub const ABUTMENT_STRESS: &str = "abutment_stress";
pub const COMPOSITE_RISK: &str = "composite_risk";

/// Tolerance for the CPT column-sum invariant.
const CPT_SUM_TOLERANCE: f64 = 1e-6;

/// Suffix used to name previous-slice copies of a variable inside factors.
const PREVIOUS_SLICE_SUFFIX: &str = "@t-1";

/// Name of the previous-slice copy of `variable` in transition factors.
pub fn previous_slice(variable: &str) -> String {
    format!("{variable}{PREVIOUS_SLICE_SUFFIX}")
}

/// A conditional probability table with its parent order stored alongside.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Cpt {
    /// `P(node)`: one probability per state.
    Prior(Vec<f64>),
    /// `P(node | parent)`: `columns[parent_state]` is a distribution over the node.
    Conditional1 { parent: String, columns: Vec<Vec<f64>> },
    /// `P(node | parents..)`: row-major table of shape `(K, K_p1, K_p2, ..)`.
    ConditionalN { parents: Vec<String>, table: Vec<f64> },
}

impl Cpt {
    /// Parent names in table axis order.
    pub fn parents(&self) -> Vec<&str> {
        match self {
            Cpt::Prior(_) => Vec::new(),
            Cpt::Conditional1 { parent, .. } => vec![parent.as_str()],
            Cpt::ConditionalN { parents, .. } => parents.iter().map(String::as_str).collect(),
        }
    }

    /// Builds the factor over `node` (first axis) and the given parent axis names.
    fn to_factor(
        &self,
        node: &str,
        cardinality: usize,
        parent_axes: &[(String, usize)],
    ) -> Result<Factor, ConfigurationError> {
        let mut scope: Vec<(String, usize)> = Vec::with_capacity(parent_axes.len() + 1);
        scope.push((node.to_string(), cardinality));
        scope.extend(parent_axes.iter().cloned());

        let values = match self {
            Cpt::Prior(probs) => probs.clone(),
            Cpt::Conditional1 { columns, .. } => {
                let parent_card = parent_axes.first().map_or(0, |(_, card)| *card);
                if columns.len() != parent_card {
                    return Err(ConfigurationError::ShapeMismatch {
                        name: node.to_string(),
                        expected: parent_card,
                        actual: columns.len(),
                    });
                }
                let mut values = vec![0.0; cardinality * parent_card];
                for (parent_state, column) in columns.iter().enumerate() {
                    if column.len() != cardinality {
                        return Err(ConfigurationError::ShapeMismatch {
                            name: node.to_string(),
                            expected: cardinality,
                            actual: column.len(),
                        });
                    }
                    for (state, &p) in column.iter().enumerate() {
                        values[state * parent_card + parent_state] = p;
                    }
                }
                values
            }
            Cpt::ConditionalN { table, .. } => table.clone(),
        };

        let factor = Factor::new(scope, values).map_err(|err| match err {
            ConfigurationError::ShapeMismatch {
                expected, actual, ..
            } => ConfigurationError::ShapeMismatch {
                name: node.to_string(),
                expected,
                actual,
            },
            other => other,
        })?;
        check_column_sums(node, &factor)?;
        Ok(factor)
    }
}

/// Every parent assignment must give a distribution over the node axis.
fn check_column_sums(node: &str, factor: &Factor) -> Result<(), ConfigurationError> {
    let cardinality = factor.cardinalities()[0];
    let columns = factor.values().len() / cardinality;
    for column in 0..columns {
        let sum: f64 = (0..cardinality)
            .map(|state| factor.values()[state * columns + column])
            .sum();
        if (sum - 1.0).abs() > CPT_SUM_TOLERANCE {
            return Err(ConfigurationError::InvalidProbabilities {
                node: node.to_string(),
                reason: format!("parent assignment {} sums to {:.6}", column, sum),
            });
        }
    }
    Ok(())
}

/// One variable of the two-slice template.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub name: String,
    pub cardinality: usize,
    /// Intra-slice table `P(node | intra parents)`.
    pub cpt: Cpt,
    /// Transition table `P(node_t | temporal parents_{t-1})`, if the node persists.
    pub temporal_cpt: Option<Cpt>,
}

impl Node {
    pub fn new(name: impl Into<String>, cardinality: usize, cpt: Cpt) -> Self {
        Self {
            name: name.into(),
            cardinality,
            cpt,
            temporal_cpt: None,
        }
    }

    pub fn with_transition(mut self, temporal_cpt: Cpt) -> Self {
        self.temporal_cpt = Some(temporal_cpt);
        self
    }

    pub fn intra_parents(&self) -> Vec<&str> {
        self.cpt.parents()
    }

    pub fn temporal_parents(&self) -> Vec<&str> {
        self.temporal_cpt
            .as_ref()
            .map(Cpt::parents)
            .unwrap_or_default()
    }

    pub fn is_root(&self) -> bool {
        self.cpt.parents().is_empty()
    }
}

/// Structural report for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeSummary {
    pub name: String,
    pub cardinality: usize,
    pub intra_parents: Vec<String>,
    pub temporal_parents: Vec<String>,
}

/// Structural report for a whole network.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkSummary {
    pub nodes: Vec<NodeSummary>,
    pub topological_order: Vec<String>,
}

/// Validated two-slice network with cached CPT factors.
#[derive(Debug, Clone)]
pub struct Network {
    nodes: Vec<Node>,
    index: FxHashMap<String, usize>,
    topological_order: Vec<usize>,
    cpt_factors: Vec<Factor>,
    transition_factors: Vec<Option<Factor>>,
}

impl Network {
    /// Validates `nodes` and builds the network.
    ///
    /// Fails on duplicate names, unknown parents, zero cardinalities, CPT shapes
    /// that disagree with parent cardinalities, columns that do not sum to one,
    /// and cyclic intra-slice parentage.
    pub fn new(nodes: Vec<Node>) -> Result<Self, ConfigurationError> {
        let mut index = FxHashMap::default();
        for (idx, node) in nodes.iter().enumerate() {
            if node.cardinality == 0 {
                return Err(ConfigurationError::ShapeMismatch {
                    name: node.name.clone(),
                    expected: 1,
                    actual: 0,
                });
            }
            if index.insert(node.name.clone(), idx).is_some() {
                return Err(ConfigurationError::DuplicateVariable(node.name.clone()));
            }
        }

        let lookup = |name: &str| -> Result<usize, ConfigurationError> {
            index
                .get(name)
                .copied()
                .ok_or_else(|| ConfigurationError::UnknownVariable(name.to_string()))
        };

        let mut cpt_factors = Vec::with_capacity(nodes.len());
        let mut transition_factors = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let mut axes = Vec::new();
            for parent in node.intra_parents() {
                let parent_idx = lookup(parent)?;
                axes.push((parent.to_string(), nodes[parent_idx].cardinality));
            }
            cpt_factors.push(node.cpt.to_factor(&node.name, node.cardinality, &axes)?);

            let transition = match &node.temporal_cpt {
                None => None,
                Some(cpt) => {
                    let mut axes = Vec::new();
                    for parent in cpt.parents() {
                        let parent_idx = lookup(parent)?;
                        axes.push((previous_slice(parent), nodes[parent_idx].cardinality));
                    }
                    Some(cpt.to_factor(&node.name, node.cardinality, &axes)?)
                }
            };
            transition_factors.push(transition);
        }

        let topological_order = topological_sort(&nodes, &index)?;

        Ok(Self {
            nodes,
            index,
            topological_order,
            cpt_factors,
            transition_factors,
        })
    }

    /// The five-node mining-pressure template.
    pub fn mining_pressure() -> Result<Self, ConfigurationError> {
        let hazard = Node::new(
            GEOLOGICAL_HAZARD,
            RISK_STATES,
            Cpt::Prior(vec![0.4, 0.4, 0.2]),
        )
        .with_transition(self_transition(
            GEOLOGICAL_HAZARD,
            [[0.7, 0.2, 0.1], [0.2, 0.6, 0.2], [0.1, 0.2, 0.7]],
        ));

        let roof = indicator_node(
            ROOF_STABILITY,
            [[0.7, 0.25, 0.05], [0.3, 0.5, 0.2], [0.1, 0.3, 0.6]],
            [[0.6, 0.3, 0.1], [0.25, 0.5, 0.25], [0.1, 0.3, 0.6]],
        );
        let burst = indicator_node(
            BURST_RISK,
            [[0.6, 0.3, 0.1], [0.25, 0.5, 0.25], [0.1, 0.25, 0.65]],
            [[0.7, 0.2, 0.1], [0.2, 0.6, 0.2], [0.1, 0.2, 0.7]],
        );
        let abutment = indicator_node(
            ABUTMENT_STRESS,
            [[0.65, 0.25, 0.1], [0.25, 0.55, 0.2], [0.15, 0.3, 0.55]],
            [[0.65, 0.25, 0.1], [0.25, 0.5, 0.25], [0.1, 0.25, 0.65]],
        );

        let composite = Node::new(
            COMPOSITE_RISK,
            RISK_STATES,
            Cpt::ConditionalN {
                parents: vec![
                    ROOF_STABILITY.to_string(),
                    BURST_RISK.to_string(),
                    ABUTMENT_STRESS.to_string(),
                ],
                table: composite_table(),
            },
        );

        Self::new(vec![hazard, roof, burst, abutment, composite])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&idx| &self.nodes[idx])
    }

    pub fn cardinality(&self, name: &str) -> Result<usize, ConfigurationError> {
        self.node(name)
            .map(|node| node.cardinality)
            .ok_or_else(|| ConfigurationError::UnknownVariable(name.to_string()))
    }

    /// Nodes ordered so that every intra parent precedes its children.
    pub fn topological_order(&self) -> impl Iterator<Item = &Node> + '_ {
        self.topological_order.iter().map(|&idx| &self.nodes[idx])
    }

    /// Nodes with no intra-slice parents.
    pub fn roots(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(|node| node.is_root())
    }

    /// Cached factor over `[node, intra parents..]`.
    pub fn cpt_factor(&self, name: &str) -> Result<&Factor, ConfigurationError> {
        self.index
            .get(name)
            .map(|&idx| &self.cpt_factors[idx])
            .ok_or_else(|| ConfigurationError::UnknownVariable(name.to_string()))
    }

    /// Cached factor over `[node, previous-slice temporal parents..]`.
    pub fn transition_factor(&self, name: &str) -> Option<&Factor> {
        self.index
            .get(name)
            .and_then(|&idx| self.transition_factors[idx].as_ref())
    }

    /// Checks that every observed variable exists and its state is in range.
    pub fn validate_evidence(&self, evidence: &Evidence) -> Result<(), ConfigurationError> {
        for (name, state) in evidence.iter() {
            let cardinality = self.cardinality(name)?;
            if state >= cardinality {
                return Err(ConfigurationError::StateOutOfRange {
                    variable: name.to_string(),
                    state,
                    cardinality,
                });
            }
        }
        Ok(())
    }

    /// Swaps a node's intra-slice CPT after validating it against the network.
    ///
    /// On error the network is left unchanged.
    pub fn replace_cpt(&mut self, name: &str, cpt: Cpt) -> Result<(), ConfigurationError> {
        let idx = *self
            .index
            .get(name)
            .ok_or_else(|| ConfigurationError::UnknownVariable(name.to_string()))?;
        let mut nodes = self.nodes.clone();
        nodes[idx].cpt = cpt;
        *self = Network::new(nodes)?;
        Ok(())
    }

    pub fn summary(&self) -> NetworkSummary {
        NetworkSummary {
            nodes: self
                .nodes
                .iter()
                .map(|node| NodeSummary {
                    name: node.name.clone(),
                    cardinality: node.cardinality,
                    intra_parents: owned(node.intra_parents()),
                    temporal_parents: owned(node.temporal_parents()),
                })
                .collect(),
            topological_order: self.topological_order().map(|n| n.name.clone()).collect(),
        }
    }
}

fn owned(names: Vec<&str>) -> Vec<String> {
    names.into_iter().map(str::to_string).collect()
}

/// Kahn's algorithm; ties broken by declaration order.
fn topological_sort(
    nodes: &[Node],
    index: &FxHashMap<String, usize>,
) -> Result<Vec<usize>, ConfigurationError> {
    let mut in_degree = vec![0usize; nodes.len()];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (idx, node) in nodes.iter().enumerate() {
        for parent in node.intra_parents() {
            if let Some(&parent_idx) = index.get(parent) {
                children[parent_idx].push(idx);
                in_degree[idx] += 1;
            }
        }
    }

    let mut ready: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(idx) = ready.pop_front() {
        order.push(idx);
        for &child in &children[idx] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.push_back(child);
            }
        }
    }

    if order.len() != nodes.len() {
        let stuck = (0..nodes.len())
            .find(|&i| in_degree[i] > 0)
            .map(|i| nodes[i].name.clone())
            .unwrap_or_default();
        return Err(ConfigurationError::CyclicNetwork(stuck));
    }
    Ok(order)
}

fn by_parent_state<const K: usize>(rows: [[f64; K]; K]) -> Vec<Vec<f64>> {
    rows.iter().map(|row| row.to_vec()).collect()
}

fn self_transition<const K: usize>(name: &str, rows: [[f64; K]; K]) -> Cpt {
    Cpt::Conditional1 {
        parent: name.to_string(),
        columns: by_parent_state(rows),
    }
}

/// Indicator conditioned on the hazard root, persisting through itself.
///
/// Both arrays are indexed by parent state first.
fn indicator_node(name: &str, given_hazard: [[f64; 3]; 3], transition: [[f64; 3]; 3]) -> Node {
    Node::new(
        name,
        RISK_STATES,
        Cpt::Conditional1 {
            parent: GEOLOGICAL_HAZARD.to_string(),
            columns: by_parent_state(given_hazard),
        },
    )
    .with_transition(self_transition(name, transition))
}

/// `P(composite | roof, burst, abutment)` from the weighted mean parent state.
fn composite_table() -> Vec<f64> {
    const LOW: [f64; 3] = [0.90, 0.08, 0.02];
    const MEDIUM: [f64; 3] = [0.15, 0.70, 0.15];
    const HIGH: [f64; 3] = [0.02, 0.13, 0.85];

    let k = RISK_STATES;
    let mut table = vec![0.0; k * k * k * k];
    for roof in 0..k {
        for burst in 0..k {
            for abutment in 0..k {
                let mean_state = roof as f64 * 0.40 + burst as f64 * 0.35 + abutment as f64 * 0.25;
                let column = if mean_state < 0.8 {
                    LOW
                } else if mean_state < 1.5 {
                    MEDIUM
                } else {
                    HIGH
                };
                for (state, p) in column.iter().enumerate() {
                    table[((state * k + roof) * k + burst) * k + abutment] = *p;
                }
            }
        }
    }
    table
}
