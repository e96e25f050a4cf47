//! Action trait and closure adapter

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::ActionError;

/// One discrete unit of simulated work, e.g. a single HTTP request
///
/// Actions are immutable once registered and shared read-only by every
/// simulated user running the scenario.
#[async_trait]
pub trait Action: Send + Sync {
    /// Identifier used for selection reporting and request statistics
    fn name(&self) -> &str;

    /// Perform the work once
    async fn execute(&self) -> Result<(), ActionError>;
}

impl fmt::Debug for dyn Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("name", &self.name()).finish()
    }
}

type Handler = Box<dyn Fn() -> BoxFuture<'static, Result<(), ActionError>> + Send + Sync>;

/// Action backed by an async closure
pub struct FnAction {
    name: String,
    handler: Handler,
}

impl FnAction {
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Box::new(move || handler().boxed()),
        }
    }

    /// An action that always succeeds immediately
    pub fn noop(name: impl Into<String>) -> Self {
        Self::new(name, || async { Ok(()) })
    }
}

#[async_trait]
impl Action for FnAction {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self) -> Result<(), ActionError> {
        (self.handler)().await
    }
}
