//! Evidence and posterior value types.
//!
//! Both are ordered maps so that iteration, elimination order, and serialized
//! output are deterministic across runs.

use std::collections::btree_map;
use std::collections::BTreeMap;

/// Observed discrete states keyed by variable name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct Evidence {
    observations: BTreeMap<String, usize>,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, variable: impl Into<String>, state: usize) -> Self {
        self.observations.insert(variable.into(), state);
        self
    }

    /// Records an observation, returning the previous state if any.
    pub fn insert(&mut self, variable: impl Into<String>, state: usize) -> Option<usize> {
        self.observations.insert(variable.into(), state)
    }

    pub fn get(&self, variable: &str) -> Option<usize> {
        self.observations.get(variable).copied()
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.observations.contains_key(variable)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.observations.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Keeps only the observations whose variable satisfies `keep`.
    pub fn restricted_to(&self, mut keep: impl FnMut(&str) -> bool) -> Evidence {
        Evidence {
            observations: self
                .observations
                .iter()
                .filter(|(k, _)| keep(k))
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for Evidence {
    fn from_iter<T: IntoIterator<Item = (S, usize)>>(iter: T) -> Self {
        Evidence {
            observations: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Per-variable marginal distributions for one time step.
///
/// Produced by static inference and by each filtering step; appended to the
/// fusion history and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct Posterior {
    marginals: BTreeMap<String, Vec<f64>>,
}

impl Posterior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, variable: impl Into<String>, probabilities: Vec<f64>) {
        self.marginals.insert(variable.into(), probabilities);
    }

    pub fn get(&self, variable: &str) -> Option<&[f64]> {
        self.marginals.get(variable).map(Vec::as_slice)
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.marginals.contains_key(variable)
    }

    pub fn len(&self) -> usize {
        self.marginals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marginals.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<f64>> {
        self.marginals.iter()
    }

    /// Most probable state of `variable` (lowest index wins ties).
    pub fn most_likely_state(&self, variable: &str) -> Option<usize> {
        let probs = self.get(variable)?;
        let mut best: Option<(usize, f64)> = None;
        for (state, &p) in probs.iter().enumerate() {
            match best {
                Some((_, current)) if p <= current => {}
                _ => best = Some((state, p)),
            }
        }
        best.map(|(state, _)| state)
    }
}

impl<'a> IntoIterator for &'a Posterior {
    type Item = (&'a String, &'a Vec<f64>);
    type IntoIter = btree_map::Iter<'a, String, Vec<f64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.marginals.iter()
    }
}

/// One-hot distribution with `cardinality` states.
pub(crate) fn one_hot(cardinality: usize, state: usize) -> Vec<f64> {
    let mut probs = vec![0.0; cardinality];
    if let Some(slot) = probs.get_mut(state) {
        *slot = 1.0;
    }
    probs
}
