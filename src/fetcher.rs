use crate::PreviewError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

/// Fixed identifying user-agent sent with every document fetch. Some sites
/// refuse to serve meta tags to unidentified clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Seam between the coordinator and the network. Production code uses the
/// reqwest-backed [`Fetcher`]; tests substitute counting or blocking stubs.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch the document body at `url`.
    async fn fetch(&self, url: &str) -> Result<String, PreviewError>;
}

#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        Self::new_with_custom_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    pub fn new_with_custom_config(timeout: Duration, user_agent: &str) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to create HTTP client");
                panic!("Failed to initialize HTTP client: {}", e);
            });
        Fetcher { client }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentFetcher for Fetcher {
    async fn fetch(&self, url: &str) -> Result<String, PreviewError> {
        debug!(url = %url, "starting document fetch");

        let response = self.client.get(url).send().await.map_err(|e| {
            error!(error = %e, url = %url, "failed to send request");
            PreviewError::Network(e.to_string())
        })?;

        if !response.status().is_success() {
            return Err(PreviewError::Network(format!(
                "unexpected status: {}",
                response.status()
            )));
        }

        let body = response.text().await.map_err(|e| {
            error!(error = %e, url = %url, "failed to read response body");
            PreviewError::Network(e.to_string())
        })?;

        debug!(url = %url, content_length = body.len(), "successfully fetched document");
        Ok(body)
    }
}
