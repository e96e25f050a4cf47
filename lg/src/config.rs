//! loadgen configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::harness::HarnessConfig;
use crate::scenario::{self, ScenarioConfig};

/// Main loadgen configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base address every task path is appended to
    pub host: String,

    /// Number of simulated users
    pub users: usize,

    /// Users started per second (all at once if unset)
    #[serde(rename = "spawn-rate")]
    pub spawn_rate: Option<f64>,

    /// Stop after this many seconds (run until Ctrl-C if unset)
    #[serde(rename = "run-time-secs")]
    pub run_time_secs: Option<u64>,

    /// Per-request timeout in milliseconds
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// How long stopped users get to finish before being aborted
    #[serde(rename = "shutdown-timeout-secs")]
    pub shutdown_timeout_secs: u64,

    /// Base seed for reproducible task selection
    pub seed: Option<u64>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Additional scenarios; one named like a built-in replaces it
    pub scenarios: Vec<ScenarioConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "http://localhost:8080".to_string(),
            users: 1,
            spawn_rate: None,
            run_time_secs: None,
            request_timeout_ms: 30_000,
            shutdown_timeout_secs: 10,
            seed: None,
            log_level: None,
            scenarios: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must load. Otherwise the first readable file from
    /// [`Config::search_paths`] wins, and defaults apply when there is none.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::search_paths() {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => tracing::warn!(path = %candidate.display(), error = %e, "Skipping unreadable config"),
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Implicit config locations, most specific first: `./.loadgen.yml`,
    /// then `<config dir>/loadgen/loadgen.yml`
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".loadgen.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("loadgen").join("loadgen.yml"));
        }
        paths
    }

    /// Read only the log level, before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!(path = %path.display(), scenarios = config.scenarios.len(), "Loaded config");
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Built-in scenarios merged with configured ones
    pub fn scenarios(&self) -> Result<Vec<ScenarioConfig>, ConfigError> {
        scenario::catalog(&self.scenarios)
    }

    /// Run settings for the harness
    pub fn harness_config(&self) -> HarnessConfig {
        HarnessConfig {
            users: self.users,
            spawn_rate: self.spawn_rate,
            run_time: self.run_time_secs.map(Duration::from_secs),
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout_secs),
            seed: self.seed,
        }
    }
}
