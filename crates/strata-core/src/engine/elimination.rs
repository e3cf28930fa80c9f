//! Exact inference over a single time slice.
//!
//! [`variable_elimination`] answers joint queries by summing out every
//! non-query variable from the product of the (evidence-conditioned) CPT
//! factors. Variables are eliminated in the network's topological order. For
//! networks of this size the order has no measurable cost; it only has to
//! cover every non-query variable, which it does.
//!
//! [`enumerate_marginal`] computes the same quantity by walking the full joint.
//! It is exponential in the number of variables and exists as a reference for
//! tests and diagnostics.

use crate::engine::errors::ConfigurationError;
use crate::engine::evidence::Evidence;
use crate::engine::factor::Factor;
use crate::engine::network::Network;

/// Upper bound on the joint size [`enumerate_marginal`] will walk.
pub const MAX_ENUMERATION_STATES: usize = 1 << 20;

/// Normalized joint distribution over `query` (in query order) given `evidence`.
///
/// Observed nodes keep their conditioned factors, so evidence on a child
/// informs its parents. A query variable that is itself observed comes back
/// one-hot at the observed state.
pub fn variable_elimination(
    network: &Network,
    query: &[&str],
    evidence: &Evidence,
) -> Result<Factor, ConfigurationError> {
    validate_query(network, query)?;
    network.validate_evidence(evidence)?;

    let conditioning = evidence.restricted_to(|name| !query.contains(&name));

    let mut constant = 1.0;
    let mut factors = Vec::with_capacity(network.len() + query.len());
    for node in network.nodes() {
        let factor = network.cpt_factor(&node.name)?.condition(&conditioning)?;
        if factor.is_scalar() {
            constant *= factor.values()[0];
        } else {
            factors.push(factor);
        }
    }
    for &name in query {
        if let Some(state) = evidence.get(name) {
            factors.push(Factor::one_hot(name, network.cardinality(name)?, state)?);
        }
    }

    let elimination_order: Vec<&str> = network
        .topological_order()
        .map(|node| node.name.as_str())
        .filter(|name| !query.contains(name) && !conditioning.contains(name))
        .collect();

    for variable in elimination_order {
        let (relevant, rest): (Vec<Factor>, Vec<Factor>) =
            factors.into_iter().partition(|f| f.contains(variable));
        factors = rest;
        if relevant.is_empty() {
            continue;
        }
        let reduced = multiply_all(relevant)?.marginalize(variable);
        if reduced.is_scalar() {
            constant *= reduced.values()[0];
        } else {
            factors.push(reduced);
        }
    }

    let joint = multiply_all(factors)?
        .multiply(&Factor::scalar(constant))?
        .permute(query)?;
    Ok(joint.normalize())
}

/// Marginal distribution of a single variable.
pub fn marginal(
    network: &Network,
    variable: &str,
    evidence: &Evidence,
) -> Result<Vec<f64>, ConfigurationError> {
    Ok(variable_elimination(network, &[variable], evidence)?.into_values())
}

/// Brute-force joint over `query` by enumerating every full assignment.
pub fn enumerate_marginal(
    network: &Network,
    query: &[&str],
    evidence: &Evidence,
) -> Result<Factor, ConfigurationError> {
    validate_query(network, query)?;
    network.validate_evidence(evidence)?;

    let nodes = network.nodes();
    let cardinalities: Vec<usize> = nodes.iter().map(|n| n.cardinality).collect();
    let total = cardinalities
        .iter()
        .try_fold(1usize, |acc, &card| acc.checked_mul(card))
        .filter(|&states| states <= MAX_ENUMERATION_STATES)
        .ok_or_else(|| {
            ConfigurationError::InvalidConfig(format!(
                "joint over {} variables exceeds {} states",
                nodes.len(),
                MAX_ENUMERATION_STATES
            ))
        })?;

    let position = |name: &str| nodes.iter().position(|n| n.name == name);
    let mut scopes: Vec<Vec<usize>> = Vec::with_capacity(nodes.len());
    for node in nodes {
        let factor = network.cpt_factor(&node.name)?;
        let scope = factor
            .variables()
            .iter()
            .map(|v| {
                position(v.as_ref())
                    .ok_or_else(|| ConfigurationError::UnknownVariable(v.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        scopes.push(scope);
    }
    let query_positions: Vec<usize> = query.iter().filter_map(|q| position(*q)).collect();
    let observed: Vec<(usize, usize)> = evidence
        .iter()
        .filter_map(|(name, state)| position(name).map(|idx| (idx, state)))
        .collect();

    let query_cards: Vec<usize> = query_positions.iter().map(|&i| cardinalities[i]).collect();
    let mut table = vec![0.0; query_cards.iter().product()];
    let mut assignment = vec![0usize; nodes.len()];
    let mut local = Vec::with_capacity(8);

    for _ in 0..total {
        if observed.iter().all(|&(idx, state)| assignment[idx] == state) {
            let mut joint = 1.0;
            for (node, scope) in nodes.iter().zip(&scopes) {
                local.clear();
                local.extend(scope.iter().map(|&i| assignment[i]));
                joint *= network
                    .cpt_factor(&node.name)?
                    .value_at(&local)
                    .unwrap_or(0.0);
            }
            let mut index = 0;
            for (&pos, &card) in query_positions.iter().zip(&query_cards) {
                index = index * card + assignment[pos];
            }
            table[index] += joint;
        }

        for axis in (0..nodes.len()).rev() {
            assignment[axis] += 1;
            if assignment[axis] < cardinalities[axis] {
                break;
            }
            assignment[axis] = 0;
        }
    }

    let scope = query.iter().copied().zip(query_cards.iter().copied());
    Ok(Factor::new(scope, table)?.normalize())
}

fn validate_query(network: &Network, query: &[&str]) -> Result<(), ConfigurationError> {
    if query.is_empty() {
        return Err(ConfigurationError::EmptyQuery);
    }
    for (i, name) in query.iter().enumerate() {
        if !network.contains(name) {
            return Err(ConfigurationError::UnknownVariable(name.to_string()));
        }
        if query[..i].contains(name) {
            return Err(ConfigurationError::DuplicateVariable(name.to_string()));
        }
    }
    Ok(())
}

fn multiply_all(factors: Vec<Factor>) -> Result<Factor, ConfigurationError> {
    let mut iter = factors.into_iter();
    let Some(first) = iter.next() else {
        return Ok(Factor::scalar(1.0));
    };
    iter.try_fold(first, |acc, f| acc.multiply(&f))
}
