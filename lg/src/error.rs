//! Error types for scenario setup and action execution

use std::time::Duration;
use thiserror::Error;

/// Errors raised while building a scenario or harness, before any load is generated
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Action set is empty; at least one weighted action is required")]
    EmptyActionSet,

    #[error("Action '{name}' has weight {weight}; weights must be positive")]
    NonPositiveWeight { name: String, weight: i64 },

    #[error("Action '{name}' has weight {weight}; weights may not exceed {max}", max = u32::MAX)]
    WeightTooLarge { name: String, weight: i64 },

    #[error("Action '{name}' is registered more than once")]
    DuplicateAction { name: String },

    #[error("Invalid wait policy: min {min:?} is greater than max {max:?}")]
    InvalidWaitRange { min: Duration, max: Duration },

    #[error("Invalid wait policy: {0}")]
    InvalidWaitPolicy(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Scenario '{name}' is defined more than once")]
    DuplicateScenario { name: String },

    #[error("Unknown scenario: {name}")]
    UnknownScenario { name: String },

    #[error("Invalid harness settings: {0}")]
    InvalidHarness(String),
}

/// Errors from executing a single action; recorded as failures, never fatal
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Action failed: {0}")]
    Failed(String),
}

impl ActionError {
    /// Short label used to group failures in the request statistics
    ///
    /// Labels come from a small fixed set so per-action error tallies stay bounded;
    /// the full message is only logged.
    pub fn kind(&self) -> String {
        match self {
            ActionError::Network(e) if e.is_timeout() => "timeout".to_string(),
            ActionError::Network(e) if e.is_connect() => "connect".to_string(),
            ActionError::Network(_) => "network".to_string(),
            ActionError::Status { status, .. } => format!("http {}", status),
            ActionError::Failed(_) => "failed".to_string(),
        }
    }
}
