//! HTTP access to the rollout page, wrapping reqwest.
//!
//! One GET per run. No retries: a failed fetch ends the run and the next
//! scheduled run tries again.

use std::time::Duration;

use crate::config::USER_AGENT;

/// Errors from fetching the rollout page.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Build the shared client: browser user-agent, fixed timeout, limited redirects.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(5))
        .user_agent(USER_AGENT)
        .build()
        .map_err(FetchError::Client)
}

/// Fetches the rollout page body.
#[derive(Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    url: String,
}

impl PageFetcher {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET the page. Any transport error or non-2xx status is a failure.
    pub async fn fetch(&self) -> Result<String, FetchError> {
        tracing::debug!(url = %self.url, "fetching rollout page");

        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: self.url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|source| FetchError::Transport {
            url: self.url.clone(),
            source,
        })?;
        tracing::debug!(bytes = body.len(), "rollout page received");
        Ok(body)
    }
}
