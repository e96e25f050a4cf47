//! Weighted action selection
//!
//! The running sum of weights splits `[0, total)` into one contiguous
//! sub-interval per action. A uniform draw in that range lands in action
//! `i`'s sub-interval with probability `weight_i / total`; the interval is
//! found by binary search over the precomputed prefix sums.

use std::collections::HashSet;
use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use crate::error::ConfigError;

use super::action::Action;

/// Ordered, validated set of weighted actions
#[derive(Debug, Clone)]
pub struct WeightedActionSet {
    actions: Vec<Arc<dyn Action>>,
    weights: Vec<u32>,
    /// cumulative[i] = sum of weights[0..=i]
    cumulative: Vec<u64>,
}

impl WeightedActionSet {
    /// Build a set from `(action, weight)` pairs
    ///
    /// All validation happens here so that selection can never fail.
    pub fn new(entries: Vec<(Arc<dyn Action>, u32)>) -> Result<Self, ConfigError> {
        debug!(count = entries.len(), "WeightedActionSet::new: called");
        if entries.is_empty() {
            return Err(ConfigError::EmptyActionSet);
        }

        let mut seen = HashSet::new();
        let mut actions = Vec::with_capacity(entries.len());
        let mut weights = Vec::with_capacity(entries.len());
        let mut cumulative = Vec::with_capacity(entries.len());
        let mut running = 0u64;

        for (action, weight) in entries {
            if weight == 0 {
                return Err(ConfigError::NonPositiveWeight {
                    name: action.name().to_string(),
                    weight: 0,
                });
            }
            if !seen.insert(action.name().to_string()) {
                return Err(ConfigError::DuplicateAction {
                    name: action.name().to_string(),
                });
            }
            running += u64::from(weight);
            actions.push(action);
            weights.push(weight);
            cumulative.push(running);
        }

        debug!(total_weight = running, "WeightedActionSet::new: built");
        Ok(Self {
            actions,
            weights,
            cumulative,
        })
    }

    /// Pick one action with probability proportional to its weight
    pub fn select<R: Rng>(&self, rng: &mut R) -> &Arc<dyn Action> {
        let draw = rng.random_range(0..self.total_weight());
        &self.actions[self.index_for(draw)]
    }

    /// Index of the action whose sub-interval contains `draw`
    pub(crate) fn index_for(&self, draw: u64) -> usize {
        self.cumulative.partition_point(|&end| end <= draw)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Always false; construction rejects empty sets
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn total_weight(&self) -> u64 {
        // Non-empty by construction
        self.cumulative.last().copied().unwrap_or(0)
    }

    /// Iterate `(name, weight)` in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.actions.iter().zip(&self.weights).map(|(a, w)| (a.name(), *w))
    }

    /// Expected long-run selection frequency of the named action
    pub fn share(&self, name: &str) -> Option<f64> {
        self.iter()
            .find(|(n, _)| *n == name)
            .map(|(_, w)| f64::from(w) / self.total_weight() as f64)
    }
}
