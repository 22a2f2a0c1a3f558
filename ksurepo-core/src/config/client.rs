//! HTTP client and pipeline settings

use std::time::Duration;

/// Host prefixed to the relative asset links scraped from release pages
pub const DEFAULT_RELEASE_ORIGIN: &str = "https://github.com";

/// Product token sent in every `User-Agent` header
pub const USER_AGENT_PRODUCT: &str = "KernelSU";

/// Default cap on concurrent release resolutions
pub const DEFAULT_MAX_CONCURRENT_RESOLUTIONS: usize = 8;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by every request the pipeline issues
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Sent as `User-Agent`; the upstream host throttles anonymous clients
    pub user_agent: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Upper bound on resolution tasks running at once (minimum 1)
    pub max_concurrent_resolutions: usize,

    /// Origin joined with scraped `/owner/repo/releases/download/...` paths
    pub release_origin: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: user_agent_for(env!("CARGO_PKG_VERSION")),
            timeout: DEFAULT_TIMEOUT,
            max_concurrent_resolutions: DEFAULT_MAX_CONCURRENT_RESOLUTIONS,
            release_origin: DEFAULT_RELEASE_ORIGIN.to_string(),
        }
    }
}

impl ClientConfig {
    /// Identify as a specific client build
    pub fn with_build_number(mut self, build: &str) -> Self {
        self.user_agent = user_agent_for(build);
        self
    }

    pub fn with_max_concurrent_resolutions(mut self, limit: usize) -> Self {
        if limit == 0 {
            tracing::warn!("max_concurrent_resolutions=0 is not usable; using 1");
        }
        self.max_concurrent_resolutions = limit.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// `User-Agent` value for a given build number
pub fn user_agent_for(build: &str) -> String {
    format!("{USER_AGENT_PRODUCT}/{build}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_format() {
        let config = ClientConfig::default().with_build_number("12345");
        assert_eq!(config.user_agent, "KernelSU/12345");
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let config = ClientConfig::default().with_max_concurrent_resolutions(0);
        assert_eq!(config.max_concurrent_resolutions, 1);
    }
}
