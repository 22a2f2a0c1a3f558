//! HTTP transport abstraction
//!
//! Everything the pipeline needs from the network goes through this
//! trait, so tests can swap in an in-memory transport.

use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;

use crate::config::ClientConfig;
use crate::error::{CatalogError, CatalogResult};

/// Minimal HTTP surface used by the fetcher and the release resolver
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET `url` and return the body as text
    ///
    /// Non-success statuses are errors.
    async fn get_text(&self, url: &str) -> CatalogResult<String>;

    /// GET `url` without following redirects and return `Location`, if any
    ///
    /// The body is never read.
    async fn get_location(&self, url: &str) -> CatalogResult<Option<String>>;

    /// Transport identifier for logging
    fn name(&self) -> &'static str;
}

/// reqwest-backed transport
pub struct ReqwestTransport {
    client: reqwest::Client,
    no_redirect: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let no_redirect = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .redirect(Policy::none())
            .build()
            .context("Failed to create non-redirecting HTTP client")?;

        Ok(Self {
            client,
            no_redirect,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_text(&self, url: &str) -> CatalogResult<String> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::Transport {
                url: url.to_string(),
                source: e.into(),
            })?;

        if !response.status().is_success() {
            return Err(CatalogError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.text().await.map_err(|e| CatalogError::Transport {
            url: url.to_string(),
            source: e.into(),
        })
    }

    async fn get_location(&self, url: &str) -> CatalogResult<Option<String>> {
        tracing::debug!("GET {} (no redirects)", url);

        let response = self
            .no_redirect
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::Transport {
                url: url.to_string(),
                source: e.into(),
            })?;

        Ok(response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}
