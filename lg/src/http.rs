//! HTTP GET action

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::error::{ActionError, ConfigError};
use crate::scheduler::Action;

/// Build the client shared by every user of a run
///
/// One client means one connection pool for the whole run.
pub fn build_client(timeout: Duration) -> Client {
    debug!(?timeout, "build_client: called");
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("loadgen/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// Join a host and a relative path the way a browser address bar would
///
/// The host may carry a path prefix (`http://example.com/blog`); it is kept.
pub fn target_url(host: &str, path: &str) -> Result<Url, ConfigError> {
    let joined = if path.starts_with('/') {
        format!("{}{}", host.trim_end_matches('/'), path)
    } else {
        format!("{}/{}", host.trim_end_matches('/'), path)
    };

    let url = Url::parse(&joined).map_err(|e| ConfigError::InvalidUrl {
        url: joined.clone(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl {
            url: joined,
            reason: "URL must start with http:// or https://".to_string(),
        });
    }
    Ok(url)
}

/// Issue one GET to a fixed URL
///
/// Responses with a 4xx or 5xx status count as failures. The body is read to
/// the end so the elapsed time covers the full download.
#[derive(Debug, Clone)]
pub struct HttpGet {
    name: String,
    url: Url,
    client: Client,
}

impl HttpGet {
    pub fn new(name: impl Into<String>, host: &str, path: &str, client: Client) -> Result<Self, ConfigError> {
        let name = name.into();
        let url = target_url(host, path)?;
        debug!(%name, %url, "HttpGet::new: called");
        Ok(Self { name, url, client })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Action for HttpGet {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self) -> Result<(), ActionError> {
        debug!(name = %self.name, url = %self.url, "HttpGet::execute: called");
        let response = self.client.get(self.url.clone()).send().await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            debug!(name = %self.name, %status, "HttpGet::execute: error status");
            return Err(ActionError::Status {
                status: status.as_u16(),
                url: self.url.to_string(),
            });
        }

        let body = response.bytes().await?;
        debug!(name = %self.name, %status, bytes = body.len(), "HttpGet::execute: complete");
        Ok(())
    }
}
