//! Weighted task scheduler
//!
//! Selects the next action for a simulated user in proportion to its weight
//! and decides how long the user pauses before selecting again.

mod action;
mod wait;
mod weighted;

pub use action::{Action, FnAction};
pub use wait::{WaitConfig, WaitPolicy};
pub use weighted::WeightedActionSet;
