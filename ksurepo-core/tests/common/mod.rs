//! Shared helpers for catalog integration tests
//!
//! Each test binary pulls this in with `mod common;`, so not every helper
//! is used by every binary.
#![allow(dead_code)]

use async_trait::async_trait;
use ksurepo_core::catalog::HttpTransport;
use ksurepo_core::{CatalogError, CatalogResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};

static INIT: Once = Once::new();

/// Initialize logging for tests (only once per test run)
pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

pub fn fixtures_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn fixture(relative: &str) -> String {
    let path = fixtures_path().join(relative);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("missing fixture {}: {e}", path.display()))
}

enum Route {
    Body(String),
    Status(u16),
    Redirect(String),
}

/// In-memory stand-in for the network
///
/// Unrouted URLs behave like an unreachable host.
#[derive(Default)]
pub struct FakeTransport {
    routes: HashMap<String, Route>,
    requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, url: &str, body: impl Into<String>) -> Self {
        self.routes.insert(url.to_string(), Route::Body(body.into()));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.routes.insert(url.to_string(), Route::Status(status));
        self
    }

    /// Serve `{repo}/releases/latest` and the matching assets page
    pub fn release(mut self, repo_url: &str, tag: &str, assets_html: impl Into<String>) -> Self {
        self.routes.insert(
            format!("{repo_url}/releases/latest"),
            Route::Redirect(format!("{repo_url}/releases/tag/{tag}")),
        );
        self.routes.insert(
            format!("{repo_url}/releases/expanded_assets/{tag}"),
            Route::Body(assets_html.into()),
        );
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, url: &str) {
        self.requests.lock().unwrap().push(url.to_string());
    }

    fn unreachable(url: &str) -> CatalogError {
        CatalogError::Transport {
            url: url.to_string(),
            source: anyhow::anyhow!("no route to host"),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get_text(&self, url: &str) -> CatalogResult<String> {
        self.record(url);
        match self.routes.get(url) {
            Some(Route::Body(body)) => Ok(body.clone()),
            Some(Route::Status(status)) => Err(CatalogError::HttpStatus {
                url: url.to_string(),
                status: *status,
            }),
            Some(Route::Redirect(_)) => Err(CatalogError::HttpStatus {
                url: url.to_string(),
                status: 302,
            }),
            None => Err(Self::unreachable(url)),
        }
    }

    async fn get_location(&self, url: &str) -> CatalogResult<Option<String>> {
        self.record(url);
        match self.routes.get(url) {
            Some(Route::Redirect(location)) => Ok(Some(location.clone())),
            Some(_) => Ok(None),
            None => Err(Self::unreachable(url)),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
