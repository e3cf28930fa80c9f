//! Discrete factor algebra.
//!
//! A [`Factor`] is a non-negative table over an ordered scope of named discrete
//! variables. Values are stored row-major (last axis varies fastest). Every
//! operation returns a fresh factor; nothing mutates in place.
//!
//! Supported operations:
//! - **marginalize**: sum a variable out
//! - **multiply**: pointwise product over the union scope (first-occurrence order)
//! - **condition**: slice axes fixed by evidence
//! - **normalize**: scale to unit total (zero totals are left untouched)
//! - **permute**: reorder axes to a requested scope order

use std::sync::Arc;

use smallvec::{smallvec, SmallVec};

use crate::engine::errors::ConfigurationError;
use crate::engine::evidence::Evidence;

/// Inline capacity for factor scopes. The mining network never exceeds four
/// variables in a single table.
pub(crate) type Scope<T> = SmallVec<[T; 4]>;

/// A named, possibly unnormalized probability table.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    variables: Scope<Arc<str>>,
    cardinalities: Scope<usize>,
    values: Vec<f64>,
}

impl Factor {
    /// Builds a factor from `(variable, cardinality)` pairs and a row-major table.
    ///
    /// Rejects duplicate variables, zero cardinalities, a table whose length is
    /// not the product of the cardinalities, and negative or non-finite entries.
    pub fn new<I, S>(scope: I, values: Vec<f64>) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<Arc<str>>,
    {
        let mut variables: Scope<Arc<str>> = SmallVec::new();
        let mut cardinalities: Scope<usize> = SmallVec::new();
        for (name, card) in scope {
            let name = name.into();
            if variables.iter().any(|v| *v == name) {
                return Err(ConfigurationError::DuplicateVariable(name.to_string()));
            }
            if card == 0 {
                return Err(ConfigurationError::ShapeMismatch {
                    name: name.to_string(),
                    expected: 1,
                    actual: 0,
                });
            }
            variables.push(name);
            cardinalities.push(card);
        }

        let expected: usize = cardinalities.iter().product();
        if values.len() != expected {
            return Err(ConfigurationError::ShapeMismatch {
                name: describe_scope(&variables),
                expected,
                actual: values.len(),
            });
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(ConfigurationError::InvalidProbabilities {
                node: describe_scope(&variables),
                reason: format!("entry {} is negative or non-finite", bad),
            });
        }

        Ok(Self {
            variables,
            cardinalities,
            values,
        })
    }

    /// A factor with an empty scope holding a single value.
    pub fn scalar(value: f64) -> Self {
        Self {
            variables: SmallVec::new(),
            cardinalities: SmallVec::new(),
            values: vec![value],
        }
    }

    /// Indicator factor that is 1 at `state` and 0 elsewhere.
    pub fn one_hot(
        variable: impl Into<Arc<str>>,
        cardinality: usize,
        state: usize,
    ) -> Result<Self, ConfigurationError> {
        let variable = variable.into();
        if state >= cardinality {
            return Err(ConfigurationError::StateOutOfRange {
                variable: variable.to_string(),
                state,
                cardinality,
            });
        }
        let mut values = vec![0.0; cardinality];
        values[state] = 1.0;
        Self::new([(variable, cardinality)], values)
    }

    pub fn variables(&self) -> &[Arc<str>] {
        &self.variables
    }

    pub fn cardinalities(&self) -> &[usize] {
        &self.cardinalities
    }

    /// Row-major table values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.position(variable).is_some()
    }

    pub fn cardinality_of(&self, variable: &str) -> Option<usize> {
        self.position(variable).map(|axis| self.cardinalities[axis])
    }

    pub fn is_scalar(&self) -> bool {
        self.variables.is_empty()
    }

    /// Grand total of the table.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Value at a full assignment given in scope order.
    pub fn value_at(&self, assignment: &[usize]) -> Option<f64> {
        if assignment.len() != self.cardinalities.len() {
            return None;
        }
        let strides = strides(&self.cardinalities);
        let mut index = 0;
        for ((&state, &card), &stride) in assignment
            .iter()
            .zip(self.cardinalities.iter())
            .zip(strides.iter())
        {
            if state >= card {
                return None;
            }
            index += state * stride;
        }
        self.values.get(index).copied()
    }

    /// Sums `variable` out of the table. Returns a copy when the variable is absent.
    pub fn marginalize(&self, variable: &str) -> Factor {
        let Some(axis) = self.position(variable) else {
            return self.clone();
        };

        let mut variables = self.variables.clone();
        let mut cardinalities = self.cardinalities.clone();
        variables.remove(axis);
        cardinalities.remove(axis);

        let out_strides = strides(&cardinalities);
        let mut target_map: Scope<usize> = SmallVec::with_capacity(self.cardinalities.len());
        let mut out_axis = 0;
        for source_axis in 0..self.cardinalities.len() {
            if source_axis == axis {
                target_map.push(0);
            } else {
                target_map.push(out_strides[out_axis]);
                out_axis += 1;
            }
        }

        let source_map = strides(&self.cardinalities);
        let mut values = vec![0.0; cardinalities.iter().product()];
        walk(
            &self.cardinalities,
            &source_map,
            &target_map,
            |source, target| {
                values[target] += self.values[source];
            },
        );

        Factor {
            variables,
            cardinalities,
            values,
        }
    }

    /// Pointwise product over the union of both scopes.
    ///
    /// The result scope is `self`'s variables followed by `other`'s variables
    /// that `self` lacks, each in first-occurrence order.
    pub fn multiply(&self, other: &Factor) -> Result<Factor, ConfigurationError> {
        let mut variables = self.variables.clone();
        let mut cardinalities = self.cardinalities.clone();
        for (name, &card) in other.variables.iter().zip(other.cardinalities.iter()) {
            match self.position(name) {
                Some(axis) if self.cardinalities[axis] != card => {
                    return Err(ConfigurationError::CardinalityMismatch {
                        variable: name.to_string(),
                        left: self.cardinalities[axis],
                        right: card,
                    });
                }
                Some(_) => {}
                None => {
                    variables.push(name.clone());
                    cardinalities.push(card);
                }
            }
        }

        let lhs_map = projection(&variables, self);
        let rhs_map = projection(&variables, other);
        let mut values = Vec::with_capacity(cardinalities.iter().product());
        walk(&cardinalities, &lhs_map, &rhs_map, |lhs, rhs| {
            values.push(self.values[lhs] * other.values[rhs]);
        });

        Ok(Factor {
            variables,
            cardinalities,
            values,
        })
    }

    /// Fixes every axis named in `evidence` to its observed state and drops it.
    ///
    /// Variables not in evidence keep their relative order.
    pub fn condition(&self, evidence: &Evidence) -> Result<Factor, ConfigurationError> {
        let source_strides = strides(&self.cardinalities);
        let mut offset = 0;
        let mut variables: Scope<Arc<str>> = SmallVec::new();
        let mut cardinalities: Scope<usize> = SmallVec::new();
        let mut source_map: Scope<usize> = SmallVec::new();

        for (axis, name) in self.variables.iter().enumerate() {
            let card = self.cardinalities[axis];
            match evidence.get(name) {
                Some(state) if state >= card => {
                    return Err(ConfigurationError::StateOutOfRange {
                        variable: name.to_string(),
                        state,
                        cardinality: card,
                    });
                }
                Some(state) => offset += state * source_strides[axis],
                None => {
                    variables.push(name.clone());
                    cardinalities.push(card);
                    source_map.push(source_strides[axis]);
                }
            }
        }

        let target_map = strides(&cardinalities);
        let mut values = vec![0.0; cardinalities.iter().product()];
        walk(&cardinalities, &source_map, &target_map, |source, target| {
            values[target] = self.values[offset + source];
        });

        Ok(Factor {
            variables,
            cardinalities,
            values,
        })
    }

    /// Divides by the grand total. A zero total leaves the table unchanged.
    pub fn normalize(&self) -> Factor {
        let total = self.total();
        if total == 0.0 {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                scope = %describe_scope(&self.variables),
                "normalization skipped: factor total is zero"
            );
            return self.clone();
        }
        Factor {
            variables: self.variables.clone(),
            cardinalities: self.cardinalities.clone(),
            values: self.values.iter().map(|v| v / total).collect(),
        }
    }

    /// Reorders axes to `order`, which must name exactly this factor's variables.
    pub fn permute(&self, order: &[&str]) -> Result<Factor, ConfigurationError> {
        if order.len() != self.variables.len() {
            return Err(ConfigurationError::ShapeMismatch {
                name: describe_scope(&self.variables),
                expected: self.variables.len(),
                actual: order.len(),
            });
        }

        let source_strides = strides(&self.cardinalities);
        let mut variables: Scope<Arc<str>> = SmallVec::new();
        let mut cardinalities: Scope<usize> = SmallVec::new();
        let mut source_map: Scope<usize> = SmallVec::new();
        for name in order {
            if variables.iter().any(|v| v.as_ref() == *name) {
                return Err(ConfigurationError::DuplicateVariable(name.to_string()));
            }
            let axis = self
                .position(name)
                .ok_or_else(|| ConfigurationError::UnknownVariable(name.to_string()))?;
            variables.push(self.variables[axis].clone());
            cardinalities.push(self.cardinalities[axis]);
            source_map.push(source_strides[axis]);
        }

        let target_map = strides(&cardinalities);
        let mut values = vec![0.0; self.values.len()];
        walk(&cardinalities, &source_map, &target_map, |source, target| {
            values[target] = self.values[source];
        });

        Ok(Factor {
            variables,
            cardinalities,
            values,
        })
    }

    fn position(&self, variable: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.as_ref() == variable)
    }
}

/// Row-major strides for a shape.
pub(crate) fn strides(cardinalities: &[usize]) -> Scope<usize> {
    let mut out: Scope<usize> = smallvec![0; cardinalities.len()];
    let mut acc = 1;
    for axis in (0..cardinalities.len()).rev() {
        out[axis] = acc;
        acc *= cardinalities[axis];
    }
    out
}

/// Strides of `factor` laid out along `union`; zero for axes `factor` lacks.
fn projection(union: &[Arc<str>], factor: &Factor) -> Scope<usize> {
    let own = strides(&factor.cardinalities);
    union
        .iter()
        .map(|name| factor.position(name).map_or(0, |axis| own[axis]))
        .collect()
}

/// Visits every assignment of `cardinalities` in row-major order, passing the
/// flat offsets obtained by dotting the assignment with `lhs` and `rhs`.
fn walk(
    cardinalities: &[usize],
    lhs: &[usize],
    rhs: &[usize],
    mut visit: impl FnMut(usize, usize),
) {
    let total: usize = cardinalities.iter().product();
    let mut assignment: Scope<usize> = smallvec![0; cardinalities.len()];
    let (mut li, mut ri) = (0usize, 0usize);
    for _ in 0..total {
        visit(li, ri);
        for axis in (0..cardinalities.len()).rev() {
            assignment[axis] += 1;
            li += lhs[axis];
            ri += rhs[axis];
            if assignment[axis] < cardinalities[axis] {
                break;
            }
            li -= lhs[axis] * cardinalities[axis];
            ri -= rhs[axis] * cardinalities[axis];
            assignment[axis] = 0;
        }
    }
}

fn describe_scope(variables: &[Arc<str>]) -> String {
    if variables.is_empty() {
        return "<scalar>".to_string();
    }
    variables
        .iter()
        .map(|v| v.as_ref())
        .collect::<Vec<_>>()
        .join(",")
}
