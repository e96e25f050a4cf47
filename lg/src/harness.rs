//! Harness - spawns simulated users and stops them at the end of a run
//!
//! The harness is responsible for:
//! - Spawning users as tokio tasks, optionally ramped at a fixed rate
//! - Giving each user its own RNG (seeded per user when a seed is configured)
//! - Stopping every user when the run time elapses or shutdown is requested
//! - Joining users within a shutdown timeout and collecting a report

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::metrics::{ActionStats, MetricsSink, RequestStats, Totals};
use crate::scenario::Scenario;
use crate::user::{SimulatedUser, UserSummary};

/// Run-level settings
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Number of simulated users
    pub users: usize,

    /// Users started per second; all at once when `None`
    pub spawn_rate: Option<f64>,

    /// Stop after this long; run until shutdown when `None`
    pub run_time: Option<Duration>,

    /// How long to wait for users to finish after stop
    pub shutdown_timeout: Duration,

    /// Base seed; user `n` gets `seed + n`
    pub seed: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            users: 1,
            spawn_rate: None,
            run_time: None,
            shutdown_timeout: Duration::from_secs(10),
            seed: None,
        }
    }
}

impl HarnessConfig {
    fn spawn_interval(&self) -> Result<Option<Duration>, ConfigError> {
        match self.spawn_rate {
            None => Ok(None),
            Some(rate) if rate.is_finite() && rate > 0.0 => Duration::try_from_secs_f64(1.0 / rate)
                .map(Some)
                .map_err(|_| ConfigError::InvalidHarness(format!("spawn rate {} is too small", rate))),
            Some(rate) => Err(ConfigError::InvalidHarness(format!(
                "spawn rate must be a positive number, got {}",
                rate
            ))),
        }
    }
}

/// Outcome of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub scenario: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub users: Vec<UserSummary>,
    pub stats: Vec<ActionStats>,
    pub totals: Totals,
}

impl RunReport {
    pub fn requests_per_sec(&self) -> f64 {
        if self.elapsed_ms == 0 {
            0.0
        } else {
            self.totals.requests as f64 * 1000.0 / self.elapsed_ms as f64
        }
    }
}

/// Drives one scenario with a fixed population of simulated users
pub struct Harness {
    config: HarnessConfig,
    spawn_interval: Option<Duration>,
    scenario: Scenario,
    metrics: Arc<RequestStats>,
}

impl Harness {
    /// Validate the run settings; no users are started yet
    pub fn new(config: HarnessConfig, scenario: Scenario) -> Result<Self, ConfigError> {
        debug!(?config, scenario = %scenario.name, "Harness::new: called");
        if config.users == 0 {
            return Err(ConfigError::InvalidHarness("at least one user is required".to_string()));
        }
        let spawn_interval = config.spawn_interval()?;

        Ok(Self {
            config,
            spawn_interval,
            scenario,
            metrics: Arc::new(RequestStats::new()),
        })
    }

    /// Live request counters for this run
    pub fn metrics(&self) -> Arc<RequestStats> {
        self.metrics.clone()
    }

    fn user_rng(&self, user_id: usize) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(user_id as u64)),
            None => StdRng::from_os_rng(),
        }
    }

    /// Run until the configured run time elapses or `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> RunReport
    where
        F: Future<Output = ()>,
    {
        info!(
            scenario = %self.scenario.name,
            users = self.config.users,
            spawn_rate = ?self.config.spawn_rate,
            run_time = ?self.config.run_time,
            "Starting load run"
        );
        let started_at = Utc::now();
        let start = Instant::now();

        let (stop_tx, stop_rx) = watch::channel(false);
        let sink: Arc<dyn MetricsSink> = self.metrics.clone();

        let run_time = self.config.run_time;
        let deadline = async move {
            match run_time {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        let mut handles = Vec::with_capacity(self.config.users);
        let mut ended_during_ramp = false;
        for user_id in 0..self.config.users {
            let user = SimulatedUser::new(
                user_id,
                self.scenario.actions.clone(),
                self.scenario.wait,
                self.user_rng(user_id),
                sink.clone(),
            );
            handles.push(tokio::spawn(user.run(stop_rx.clone())));
            debug!(user_id, "Harness::run: spawned user");

            if let Some(interval) = self.spawn_interval
                && user_id + 1 < self.config.users
            {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = &mut shutdown => {
                        info!("Shutdown requested during ramp-up");
                        ended_during_ramp = true;
                        break;
                    }
                    _ = &mut deadline => {
                        info!("Run time elapsed during ramp-up");
                        ended_during_ramp = true;
                        break;
                    }
                }
            }
        }

        if !ended_during_ramp {
            info!(users = handles.len(), "All users spawned");
            tokio::select! {
                _ = &mut shutdown => info!("Shutdown requested"),
                _ = &mut deadline => info!("Run time elapsed"),
            }
        }

        debug!("Harness::run: sending stop to all users");
        let _ = stop_tx.send(true);

        // One deadline for the whole population; only users still running at it are aborted
        let deadline = tokio::time::Instant::now() + self.config.shutdown_timeout;
        let mut users: Vec<UserSummary> = Vec::with_capacity(handles.len());
        let mut aborted = 0usize;
        for (user_id, mut handle) in handles.into_iter().enumerate() {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(summary)) => users.push(summary),
                Ok(Err(e)) => warn!(user_id, error = %e, "User task ended abnormally"),
                Err(_) => {
                    handle.abort();
                    aborted += 1;
                }
            }
        }
        if aborted > 0 {
            warn!(
                aborted,
                timeout = ?self.config.shutdown_timeout,
                "Users did not stop in time, aborted"
            );
        }

        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let totals = self.metrics.totals();
        info!(
            scenario = %self.scenario.name,
            requests = totals.requests,
            failures = totals.failures,
            elapsed_ms,
            "Load run finished"
        );

        RunReport {
            scenario: self.scenario.name.clone(),
            started_at,
            elapsed_ms,
            users,
            stats: self.metrics.snapshot(),
            totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{Action, FnAction, WaitPolicy, WeightedActionSet};

    fn scenario() -> Scenario {
        let set = WeightedActionSet::new(vec![(Arc::new(FnAction::noop("index")) as Arc<dyn Action>, 1)]).unwrap();
        Scenario {
            name: "test".to_string(),
            actions: Arc::new(set),
            wait: WaitPolicy::Constant(Duration::from_millis(5)),
        }
    }

    #[test]
    fn test_zero_users_rejected() {
        let config = HarnessConfig {
            users: 0,
            ..Default::default()
        };
        assert!(matches!(
            Harness::new(config, scenario()),
            Err(ConfigError::InvalidHarness(_))
        ));
    }

    #[test]
    fn test_bad_spawn_rate_rejected() {
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = HarnessConfig {
                spawn_rate: Some(rate),
                ..Default::default()
            };
            assert!(Harness::new(config, scenario()).is_err(), "rate {} accepted", rate);
        }
    }

    #[test]
    fn test_spawn_interval() {
        let config = HarnessConfig {
            spawn_rate: Some(4.0),
            ..Default::default()
        };
        assert_eq!(config.spawn_interval().unwrap(), Some(Duration::from_millis(250)));
        assert_eq!(HarnessConfig::default().spawn_interval().unwrap(), None);
    }

    #[test]
    fn test_seeded_user_rngs_are_reproducible() {
        use rand::Rng;

        let config = HarnessConfig {
            seed: Some(11),
            ..Default::default()
        };
        let harness = Harness::new(config, scenario()).unwrap();
        let a: u64 = harness.user_rng(3).random();
        let b: u64 = harness.user_rng(3).random();
        let c: u64 = harness.user_rng(4).random();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_requests_per_sec() {
        let report = RunReport {
            scenario: "test".to_string(),
            started_at: Utc::now(),
            elapsed_ms: 2000,
            users: vec![],
            stats: vec![],
            totals: Totals {
                requests: 100,
                failures: 0,
                avg_ms: 1.0,
            },
        };
        assert_eq!(report.requests_per_sec(), 50.0);
    }

    #[tokio::test]
    async fn test_run_time_stops_users() {
        let config = HarnessConfig {
            users: 3,
            run_time: Some(Duration::from_millis(200)),
            ..Default::default()
        };
        let harness = Harness::new(config, scenario()).unwrap();

        let report = tokio::time::timeout(Duration::from_secs(5), harness.run(std::future::pending()))
            .await
            .expect("run should end after its run time");

        assert_eq!(report.users.len(), 3);
        assert!(report.totals.requests > 0);
        let from_users: u64 = report.users.iter().map(|u| u.iterations).sum();
        assert_eq!(from_users, report.totals.requests);
    }

    #[tokio::test]
    async fn test_shutdown_during_ramp_up() {
        let config = HarnessConfig {
            users: 100,
            spawn_rate: Some(10.0),
            ..Default::default()
        };
        let harness = Harness::new(config, scenario()).unwrap();

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            harness.run(tokio::time::sleep(Duration::from_millis(250))),
        )
        .await
        .expect("shutdown should end the ramp-up");

        // 10 users/s for 250ms spawns the first few only
        assert!(!report.users.is_empty());
        assert!(report.users.len() < 10, "{} users spawned", report.users.len());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shutdown_timeout_keeps_finished_users() {
        use std::sync::atomic::{AtomicBool, Ordering};

        // The first execution blocks its worker thread, so that user cannot observe stop
        let blocked = Arc::new(AtomicBool::new(false));
        let action = FnAction::new("index", move || {
            if !blocked.swap(true, Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(1500));
            }
            async { Ok(()) }
        });
        let set = WeightedActionSet::new(vec![(Arc::new(action) as Arc<dyn Action>, 1)]).unwrap();
        let scenario = Scenario {
            name: "stuck".to_string(),
            actions: Arc::new(set),
            wait: WaitPolicy::Constant(Duration::from_millis(5)),
        };
        let config = HarnessConfig {
            users: 3,
            run_time: Some(Duration::from_millis(300)),
            shutdown_timeout: Duration::from_millis(200),
            ..Default::default()
        };
        let harness = Harness::new(config, scenario).unwrap();

        let started = Instant::now();
        let report = harness.run(std::future::pending()).await;

        assert!(started.elapsed() < Duration::from_millis(1400), "run waited for the blocked user");
        assert_eq!(report.users.len(), 2);
        assert!(report.users.iter().all(|u| u.iterations > 0));
        let from_users: u64 = report.users.iter().map(|u| u.iterations).sum();
        assert_eq!(from_users, report.totals.requests);
    }
}
