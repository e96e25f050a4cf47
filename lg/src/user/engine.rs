//! SimulatedUser - one continuous select/execute/wait loop

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::metrics::{ActionOutcome, ActionSample, MetricsSink};
use crate::scheduler::{WaitPolicy, WeightedActionSet};

/// What one user did before it was stopped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: usize,
    /// Actions that ran to completion (successful or not)
    pub iterations: u64,
    pub failures: u64,
}

/// One simulated client generating load
///
/// The action set and wait policy are shared read-only with every other
/// user of the scenario; the RNG is owned so users never contend on it.
pub struct SimulatedUser {
    user_id: usize,
    actions: Arc<WeightedActionSet>,
    wait: WaitPolicy,
    rng: StdRng,
    metrics: Arc<dyn MetricsSink>,
}

impl SimulatedUser {
    pub fn new(
        user_id: usize,
        actions: Arc<WeightedActionSet>,
        wait: WaitPolicy,
        rng: StdRng,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        debug!(user_id, ?wait, "SimulatedUser::new: called");
        Self {
            user_id,
            actions,
            wait,
            rng,
            metrics,
        }
    }

    pub fn user_id(&self) -> usize {
        self.user_id
    }

    /// Run until `stop` turns true or its sender is dropped
    ///
    /// The stop signal is checked before every selection and interrupts both
    /// an in-flight action and the wait-policy pause. An interrupted action is
    /// not reported. Failed actions are reported and the loop carries on.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> UserSummary {
        info!(user_id = self.user_id, "Simulated user started");
        let mut summary = UserSummary {
            user_id: self.user_id,
            ..Default::default()
        };

        while !stop_requested(&stop) {
            let action = self.actions.select(&mut self.rng).clone();
            debug!(user_id = self.user_id, action = %action.name(), "SimulatedUser::run: selected");

            let started = Instant::now();
            let Some(result) = until_stopped(&mut stop, action.execute()).await else {
                debug!(user_id = self.user_id, action = %action.name(), "SimulatedUser::run: action interrupted by stop");
                break;
            };
            let elapsed = started.elapsed();

            summary.iterations += 1;
            let outcome = match result {
                Ok(()) => ActionOutcome::Success,
                Err(e) => {
                    warn!(user_id = self.user_id, action = %action.name(), error = %e, "Action failed");
                    summary.failures += 1;
                    ActionOutcome::Failure(e.kind())
                }
            };
            self.metrics.record(ActionSample {
                action: action.name().to_string(),
                outcome,
                elapsed,
            });

            match self.wait.sample(&mut self.rng) {
                Some(pause) => {
                    debug!(user_id = self.user_id, ?pause, "SimulatedUser::run: waiting");
                    if until_stopped(&mut stop, tokio::time::sleep(pause)).await.is_none() {
                        debug!(user_id = self.user_id, "SimulatedUser::run: wait interrupted by stop");
                        break;
                    }
                }
                // Back-to-back actions that complete without awaiting must not starve other tasks
                None => tokio::task::yield_now().await,
            }
        }

        info!(
            user_id = self.user_id,
            iterations = summary.iterations,
            failures = summary.failures,
            "Simulated user stopped"
        );
        summary
    }
}

fn stop_requested(stop: &watch::Receiver<bool>) -> bool {
    *stop.borrow() || stop.has_changed().is_err()
}

/// Drive `fut` unless the stop signal fires first
async fn until_stopped<F: Future>(stop: &mut watch::Receiver<bool>, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = stop.wait_for(|stopped| *stopped) => None,
        out = fut => Some(out),
    }
}
