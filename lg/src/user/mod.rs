//! Simulated users
//!
//! A simulated user repeatedly selects a weighted action, executes it, reports
//! the outcome and pauses according to the scenario's wait policy, until the
//! harness stops it.

mod engine;

pub use engine::{SimulatedUser, UserSummary};
