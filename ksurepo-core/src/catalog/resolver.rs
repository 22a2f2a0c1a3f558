//! Latest-release resolution
//!
//! Catalogs only carry a repository home URL. Turning that into a
//! downloadable artifact takes two requests against the release host:
//!
//! ```text
//! {repo}/releases/latest                 -> 302 Location: .../tag/{tag}
//! {repo}/releases/expanded_assets/{tag}  -> HTML with href=".../releases/download/.../*.zip"
//! ```
//!
//! Any failure along the way means "no release", never an error.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::transport::HttpTransport;
use crate::config::DEFAULT_RELEASE_ORIGIN;

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/tag/([^/?\s]+)").expect("tag pattern is valid"));

static ZIP_HREF_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href="(/[^"]+/releases/download/[^"]+\.zip)""#).expect("zip pattern is valid")
});

/// A resolved release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    pub version: String,
    pub zip_url: String,
}

/// Strategy for finding a repository's latest downloadable release
#[async_trait]
pub trait ReleaseResolver: Send + Sync {
    /// `None` covers both "no release" and any failure while looking
    async fn resolve_latest_release(&self, repo_url: &str) -> Option<ReleaseInfo>;

    /// Resolver identifier for logging
    fn name(&self) -> &'static str;
}

/// Resolves releases by following the `latest` redirect and scraping the
/// expanded-assets fragment
pub struct ScrapingResolver {
    transport: Arc<dyn HttpTransport>,
    origin: String,
}

impl ScrapingResolver {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_origin(transport, DEFAULT_RELEASE_ORIGIN)
    }

    pub fn with_origin(transport: Arc<dyn HttpTransport>, origin: &str) -> Self {
        Self {
            transport,
            origin: origin.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ReleaseResolver for ScrapingResolver {
    async fn resolve_latest_release(&self, repo_url: &str) -> Option<ReleaseInfo> {
        let repo_url = repo_url.trim_end_matches('/');
        if repo_url.is_empty() {
            return None;
        }

        let latest_url = format!("{repo_url}/releases/latest");
        let location = match self.transport.get_location(&latest_url).await {
            Ok(Some(location)) => location,
            Ok(None) => {
                tracing::debug!("No latest-release redirect for {}", repo_url);
                return None;
            }
            Err(e) => {
                tracing::debug!("Latest-release lookup failed for {}: {}", repo_url, e);
                return None;
            }
        };

        let Some(tag) = extract_tag(&location) else {
            tracing::debug!("Redirect for {} has no tag: {}", repo_url, location);
            return None;
        };

        let assets_url = format!("{repo_url}/releases/expanded_assets/{tag}");
        let html = match self.transport.get_text(&assets_url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!("Assets page failed for {}: {}", repo_url, e);
                return None;
            }
        };

        let Some(path) = extract_zip_path(&html) else {
            tracing::debug!("No zip asset in release {} of {}", tag, repo_url);
            return None;
        };

        Some(ReleaseInfo {
            version: tag,
            zip_url: format!("{}{}", self.origin, path),
        })
    }

    fn name(&self) -> &'static str {
        "scraping"
    }
}

/// Pull the release tag out of a `/releases/latest` redirect target
pub fn extract_tag(location: &str) -> Option<String> {
    TAG_PATTERN
        .captures(location)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// First `.zip` download link (host-relative) in an assets page
pub fn extract_zip_path(html: &str) -> Option<String> {
    ZIP_HREF_PATTERN
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
