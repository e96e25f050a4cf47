//! Pause between a simulated user's consecutive actions

use std::fmt;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Rule governing the pause after each action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitPolicy {
    /// Proceed to the next selection immediately
    #[default]
    None,

    /// Pause for a duration drawn uniformly from `[min, max]`
    Uniform { min: Duration, max: Duration },

    /// Pause for a fixed duration
    Constant(Duration),
}

impl WaitPolicy {
    pub fn uniform(min: Duration, max: Duration) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidWaitRange { min, max });
        }
        Ok(WaitPolicy::Uniform { min, max })
    }

    /// Draw the next pause, or `None` when no pause applies
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Option<Duration> {
        match *self {
            WaitPolicy::None => None,
            WaitPolicy::Constant(d) => Some(d),
            WaitPolicy::Uniform { min, max } => {
                let nanos = rng.random_range(duration_nanos(min)..=duration_nanos(max));
                Some(Duration::from_nanos(nanos))
            }
        }
    }

    /// Longest pause this policy can produce
    pub fn upper_bound(&self) -> Duration {
        match *self {
            WaitPolicy::None => Duration::ZERO,
            WaitPolicy::Constant(d) => d,
            WaitPolicy::Uniform { max, .. } => max,
        }
    }
}

impl fmt::Display for WaitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitPolicy::None => write!(f, "none"),
            WaitPolicy::Uniform { min, max } => write!(f, "uniform({:?}, {:?})", min, max),
            WaitPolicy::Constant(d) => write!(f, "constant({:?})", d),
        }
    }
}

fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// Wait policy as written in scenario files
///
/// ```yaml
/// wait: { kind: uniform, min-secs: 1, max-secs: 5 }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum WaitConfig {
    #[default]
    None,

    #[serde(rename_all = "kebab-case")]
    Uniform { min_secs: f64, max_secs: f64 },

    Constant { secs: f64 },
}

impl WaitConfig {
    /// Validate and convert into a runtime policy
    pub fn to_policy(&self) -> Result<WaitPolicy, ConfigError> {
        match *self {
            WaitConfig::None => Ok(WaitPolicy::None),
            WaitConfig::Constant { secs } => Ok(WaitPolicy::Constant(secs_to_duration(secs)?)),
            WaitConfig::Uniform { min_secs, max_secs } => {
                WaitPolicy::uniform(secs_to_duration(min_secs)?, secs_to_duration(max_secs)?)
            }
        }
    }
}

impl From<WaitPolicy> for WaitConfig {
    fn from(policy: WaitPolicy) -> Self {
        match policy {
            WaitPolicy::None => WaitConfig::None,
            WaitPolicy::Constant(d) => WaitConfig::Constant { secs: d.as_secs_f64() },
            WaitPolicy::Uniform { min, max } => WaitConfig::Uniform {
                min_secs: min.as_secs_f64(),
                max_secs: max.as_secs_f64(),
            },
        }
    }
}

fn secs_to_duration(secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| ConfigError::InvalidWaitPolicy(format!("{} is not a valid non-negative number of seconds", secs)))
}
