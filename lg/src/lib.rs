//! loadgen - weighted-task HTTP load generator
//!
//! Simulated users repeatedly pick one of a scenario's weighted tasks, run it,
//! report the outcome and pause according to the scenario's wait policy.
//!
//! # Core Concepts
//!
//! - **Weighted selection**: each task is chosen with probability `weight / total`
//! - **Validated up front**: empty task lists, non-positive weights and bad wait
//!   ranges are rejected while building a scenario, never during a run
//! - **Cancellable users**: stopping a run interrupts in-flight requests and pauses
//! - **Failures are counted, not retried**: a failed request never stops a user
//!
//! # Modules
//!
//! - [`scheduler`] - actions, weighted selection and wait policies
//! - [`user`] - the simulated user loop
//! - [`metrics`] - per-action request counters
//! - [`http`] - HTTP GET action
//! - [`scenario`] - scenario definitions and built-ins
//! - [`harness`] - spawning and stopping users for a run
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface
//!
//! # Example
//!
//! ```ignore
//! use loadgen::{Harness, HarnessConfig, scenario};
//!
//! let client = loadgen::http::build_client(std::time::Duration::from_secs(30));
//! let blog = scenario::find(&scenario::builtin(), "blog")?.build("http://localhost:8080", &client)?;
//! let harness = Harness::new(HarnessConfig { users: 10, ..Default::default() }, blog)?;
//! let report = harness.run(async { let _ = tokio::signal::ctrl_c().await; }).await;
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod harness;
pub mod http;
pub mod metrics;
pub mod scenario;
pub mod scheduler;
pub mod user;

// Re-export commonly used types
pub use config::Config;
pub use error::{ActionError, ConfigError};
pub use harness::{Harness, HarnessConfig, RunReport};
pub use http::HttpGet;
pub use metrics::{ActionOutcome, ActionSample, ActionStats, MetricsSink, RequestStats, Totals};
pub use scenario::{Scenario, ScenarioConfig, TaskConfig};
pub use scheduler::{Action, FnAction, WaitConfig, WaitPolicy, WeightedActionSet};
pub use user::{SimulatedUser, UserSummary};
