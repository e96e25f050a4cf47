//! In-memory request counters
//!
//! Tracks per-action and global counters:
//! - Request and failure counts
//! - Total, min and max elapsed time
//! - Failure counts grouped by error label

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ActionOutcome, ActionSample, MetricsSink};

/// Counters for a single action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionStats {
    /// Action name
    pub action: String,
    /// Executions reported (successful or not)
    pub requests: u64,
    /// Failed executions
    pub failures: u64,
    /// Sum of elapsed time in microseconds
    pub total_elapsed_us: u64,
    /// Fastest execution in microseconds
    pub min_elapsed_us: u64,
    /// Slowest execution in microseconds
    pub max_elapsed_us: u64,
    /// Failure counts by error label
    pub errors: BTreeMap<String, u64>,
}

impl ActionStats {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    /// Fold one sample into the counters
    pub fn record(&mut self, outcome: &ActionOutcome, elapsed: Duration) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        if self.requests == 0 {
            self.min_elapsed_us = us;
        } else {
            self.min_elapsed_us = self.min_elapsed_us.min(us);
        }
        self.max_elapsed_us = self.max_elapsed_us.max(us);
        self.total_elapsed_us = self.total_elapsed_us.saturating_add(us);
        self.requests += 1;

        if let ActionOutcome::Failure(label) = outcome {
            self.failures += 1;
            *self.errors.entry(label.clone()).or_default() += 1;
        }
    }

    /// Mean elapsed time in milliseconds
    pub fn avg_ms(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.total_elapsed_us as f64 / self.requests as f64 / 1000.0
        }
    }

    /// Fraction of executions that failed
    pub fn failure_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.failures as f64 / self.requests as f64
        }
    }
}

/// Aggregate over all actions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub requests: u64,
    pub failures: u64,
    pub avg_ms: f64,
}

/// Thread-safe collector shared by every simulated user of a run
#[derive(Debug, Default)]
pub struct RequestStats {
    actions: RwLock<HashMap<String, ActionStats>>,
    total_requests: AtomicU64,
    total_failures: AtomicU64,
}

impl RequestStats {
    pub fn new() -> Self {
        debug!("RequestStats::new: called");
        Self::default()
    }

    /// Per-action counters sorted by action name
    pub fn snapshot(&self) -> Vec<ActionStats> {
        debug!("RequestStats::snapshot: called");
        let mut stats: Vec<_> = self
            .actions
            .read()
            .map(|a| a.values().cloned().collect())
            .unwrap_or_default();
        stats.sort_by(|a, b| a.action.cmp(&b.action));
        stats
    }

    /// Counters for one action
    pub fn get(&self, action: &str) -> Option<ActionStats> {
        self.actions.read().ok()?.get(action).cloned()
    }

    pub fn totals(&self) -> Totals {
        let snapshot = self.snapshot();
        let requests = self.total_requests.load(Ordering::Relaxed);
        let total_us: u64 = snapshot.iter().map(|s| s.total_elapsed_us).sum();
        Totals {
            requests,
            failures: self.total_failures.load(Ordering::Relaxed),
            avg_ms: if requests == 0 {
                0.0
            } else {
                total_us as f64 / requests as f64 / 1000.0
            },
        }
    }
}

impl MetricsSink for RequestStats {
    fn record(&self, sample: ActionSample) {
        debug!(action = %sample.action, outcome = ?sample.outcome, elapsed_us = sample.elapsed.as_micros() as u64, "RequestStats::record: called");
        if let Ok(mut actions) = self.actions.write() {
            actions
                .entry(sample.action.clone())
                .or_insert_with(|| ActionStats::new(&sample.action))
                .record(&sample.outcome, sample.elapsed);
        } else {
            debug!(action = %sample.action, "record: failed to acquire actions write lock");
        }

        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if !sample.outcome.is_success() {
            self.total_failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}
