//! Reporting of executed actions
//!
//! Every executed action produces one [`ActionSample`] handed to a
//! [`MetricsSink`]. The sink is shared by all simulated users of a run.

mod collector;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use collector::{ActionStats, RequestStats, Totals};

/// Outcome of executing one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Success,
    /// Failure with a short error label
    Failure(String),
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Success)
    }
}

/// One executed action as reported by a simulated user
#[derive(Debug, Clone)]
pub struct ActionSample {
    pub action: String,
    pub outcome: ActionOutcome,
    pub elapsed: Duration,
}

/// Receiver of per-action results
pub trait MetricsSink: Send + Sync {
    fn record(&self, sample: ActionSample);
}
