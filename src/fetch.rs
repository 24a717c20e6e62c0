//! Outbound retrieval of stylesheets and font files
//!
//! A single GET per call with a fixed timeout. No retries happen here;
//! failures are classified so callers can tell a malformed request (the
//! origin answered 400) from everything else.

use crate::config::UpstreamConfig;
use crate::error::{GfoError, GfoResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Retrieves the body of a URL
#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET `url` and return the response body of a 2xx response
    async fn fetch(&self, url: &str) -> GfoResult<Vec<u8>>;
}

/// Map a response status to the fetch outcome
pub fn check_status(url: &str, status: u16) -> GfoResult<()> {
    match status {
        200..=299 => Ok(()),
        400 => Err(GfoError::UpstreamBadRequest {
            url: url.to_string(),
            status,
        }),
        _ => Err(GfoError::upstream(
            url,
            format!("status {} is not in range 200-299", status),
        )),
    }
}

/// HTTP fetcher backed by a blocking `ureq` agent
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    user_agent: Option<String>,
    max_body_bytes: u64,
}

impl HttpFetcher {
    /// Create a fetcher from the upstream settings
    pub fn new(config: &UpstreamConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs.max(1))))
            .http_status_as_error(false)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            user_agent: config.user_agent.clone(),
            max_body_bytes: config.max_body_bytes,
        }
    }

    fn fetch_blocking(&self, url: &str) -> GfoResult<Vec<u8>> {
        let mut request = self.agent.get(url);
        if let Some(ref user_agent) = self.user_agent {
            request = request.header("User-Agent", user_agent.as_str());
        }

        let mut response = request
            .call()
            .map_err(|e| GfoError::upstream(url, e.to_string()))?;

        check_status(url, response.status().as_u16())?;

        response
            .body_mut()
            .with_config()
            .limit(self.max_body_bytes)
            .read_to_vec()
            .map_err(|e| GfoError::upstream(url, format!("reading body: {}", e)))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> GfoResult<Vec<u8>> {
        debug!(url, "Fetching");
        let fetcher = self.clone();
        let owned_url = url.to_string();

        let body = tokio::task::spawn_blocking(move || fetcher.fetch_blocking(&owned_url))
            .await
            .map_err(|e| GfoError::Internal(format!("fetch task failed: {}", e)))??;

        debug!(url, "Fetched {} bytes", body.len());
        Ok(body)
    }
}
