//! Bounded posterior history and trend fitting.

use std::collections::VecDeque;

use crate::engine::evidence::Posterior;
use crate::engine::network::COMPOSITE_RISK;
use crate::fusion::mapping::{risk_level, state_to_value};
use crate::fusion::types::{TrendDirection, TrendReport};

/// Fewest entries a trend is fitted over.
pub const MIN_TREND_POINTS: usize = 3;

pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// FIFO buffer of per-call posteriors, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionHistory {
    entries: VecDeque<Posterior>,
    capacity: usize,
}

impl FusionHistory {
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&Posterior> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Posterior> + ExactSizeIterator + '_ {
        self.entries.iter()
    }

    /// Appends `posterior`, returning the evicted oldest entry when full.
    pub fn push(&mut self, posterior: Posterior) -> Option<Posterior> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(posterior);
        evicted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Composite scores of the stored posteriors, oldest first.
    ///
    /// Entries without a composite marginal are skipped.
    pub fn composite_scores(&self) -> Vec<f64> {
        self.entries
            .iter()
            .filter_map(|p| p.get(COMPOSITE_RISK))
            .map(state_to_value)
            .collect()
    }

    /// Least-squares trend over the newest `window` entries (all when `None`).
    ///
    /// `None` with fewer than [`MIN_TREND_POINTS`] usable entries.
    pub fn trend(&self, window: Option<usize>, slope_threshold: f64) -> Option<TrendReport> {
        let scores = self.composite_scores();
        let take = window.map_or(scores.len(), |w| w.min(scores.len()));
        let recent = &scores[scores.len() - take..];
        if recent.len() < MIN_TREND_POINTS {
            return None;
        }

        let slope = least_squares_slope(recent);
        let direction = if slope < -slope_threshold {
            TrendDirection::RisingRisk
        } else if slope > slope_threshold {
            TrendDirection::FallingRisk
        } else {
            TrendDirection::Stable
        };
        let current = *recent.last()?;

        Some(TrendReport {
            slope,
            direction,
            window: recent.len(),
            current_level: risk_level(current),
        })
    }
}

impl Default for FusionHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Slope of the degree-1 fit of `ys` against `0..n`.
fn least_squares_slope(ys: &[f64]) -> f64 {
    let n = ys.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }
    if sxx == 0.0 {
        0.0
    } else {
        sxy / sxx
    }
}
