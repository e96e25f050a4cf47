//! Scenario definitions
//!
//! A scenario is a named list of weighted HTTP tasks plus a wait policy.
//! Scenarios are written in YAML:
//!
//! ```yaml
//! name: blog-paced
//! wait: { kind: uniform, min-secs: 1, max-secs: 5 }
//! tasks:
//!   - { name: index, path: "/", weight: 1 }
//!   - { name: page_128, path: "/?p=128", weight: 5 }
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::http::HttpGet;
use crate::scheduler::{Action, WaitConfig, WaitPolicy, WeightedActionSet};

/// One weighted GET request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Name reported in request statistics
    pub name: String,

    /// Path relative to the target host
    pub path: String,

    /// Relative selection frequency; must be positive
    pub weight: i64,
}

impl TaskConfig {
    pub fn new(name: impl Into<String>, path: impl Into<String>, weight: i64) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            weight,
        }
    }
}

/// Scenario as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,

    /// Pause between a user's consecutive tasks (default: none)
    #[serde(default)]
    pub wait: WaitConfig,

    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

/// Validated scenario ready to hand to simulated users
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub actions: Arc<WeightedActionSet>,
    pub wait: WaitPolicy,
}

impl ScenarioConfig {
    /// Validate the scenario and bind its tasks to `host`
    ///
    /// Every configuration problem surfaces here, before any load is generated.
    pub fn build(&self, host: &str, client: &Client) -> Result<Scenario, ConfigError> {
        debug!(name = %self.name, %host, tasks = self.tasks.len(), "ScenarioConfig::build: called");
        if self.tasks.is_empty() {
            return Err(ConfigError::EmptyActionSet);
        }

        let mut entries: Vec<(Arc<dyn Action>, u32)> = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            if task.weight <= 0 {
                return Err(ConfigError::NonPositiveWeight {
                    name: task.name.clone(),
                    weight: task.weight,
                });
            }
            let weight = u32::try_from(task.weight).map_err(|_| ConfigError::WeightTooLarge {
                name: task.name.clone(),
                weight: task.weight,
            })?;
            let action: Arc<dyn Action> = Arc::new(HttpGet::new(&task.name, host, &task.path, client.clone())?);
            entries.push((action, weight));
        }

        let actions = WeightedActionSet::new(entries)?;
        let wait = self.wait.to_policy()?;
        debug!(name = %self.name, total_weight = actions.total_weight(), ?wait, "ScenarioConfig::build: built");

        Ok(Scenario {
            name: self.name.clone(),
            actions: Arc::new(actions),
            wait,
        })
    }
}

/// Scenarios shipped with the binary
///
/// `blog` browses six blog pages back to back with no pause, probing maximum
/// throughput. `blog-paced` alternates between the index and one post with a
/// 1-5 second think time between requests.
pub fn builtin() -> Vec<ScenarioConfig> {
    vec![
        ScenarioConfig {
            name: "blog".to_string(),
            wait: WaitConfig::None,
            tasks: vec![
                TaskConfig::new("index", "/", 1),
                TaskConfig::new("page_136", "/?p=136", 2),
                TaskConfig::new("page_152", "/?p=152", 3),
                TaskConfig::new("page_151", "/?p=151", 3),
                TaskConfig::new("page_132", "/?p=132", 4),
                TaskConfig::new("page_128", "/?p=128", 5),
            ],
        },
        ScenarioConfig {
            name: "blog-paced".to_string(),
            wait: WaitConfig::Uniform {
                min_secs: 1.0,
                max_secs: 5.0,
            },
            tasks: vec![TaskConfig::new("index", "/", 1), TaskConfig::new("page_128", "/?p=128", 5)],
        },
    ]
}

/// Built-in scenarios followed by configured ones; a configured scenario
/// replaces the built-in of the same name
///
/// Configured names must be unique, otherwise lookups would silently pick one.
pub fn catalog(configured: &[ScenarioConfig]) -> Result<Vec<ScenarioConfig>, ConfigError> {
    let mut seen = HashSet::new();
    for config in configured {
        if !seen.insert(config.name.as_str()) {
            return Err(ConfigError::DuplicateScenario {
                name: config.name.clone(),
            });
        }
    }

    let mut all: Vec<ScenarioConfig> = builtin()
        .into_iter()
        .filter(|b| !seen.contains(b.name.as_str()))
        .collect();
    all.extend(configured.iter().cloned());
    Ok(all)
}

/// Look a scenario up by name
pub fn find<'a>(scenarios: &'a [ScenarioConfig], name: &str) -> Result<&'a ScenarioConfig, ConfigError> {
    scenarios
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| ConfigError::UnknownScenario { name: name.to_string() })
}
