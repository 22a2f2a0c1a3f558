//! Catalog source fetching

use futures::future::join_all;
use std::sync::Arc;

use super::descriptor::{parse_catalog, CatalogKind, ModuleDescriptor};
use super::transport::HttpTransport;
use crate::error::CatalogResult;

/// Fetches and parses catalog sources of one kind
#[derive(Clone)]
pub struct SourceFetcher {
    transport: Arc<dyn HttpTransport>,
    kind: CatalogKind,
}

impl SourceFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, kind: CatalogKind) -> Self {
        Self { transport, kind }
    }

    pub fn kind(&self) -> CatalogKind {
        self.kind
    }

    /// Fetch a single catalog
    pub async fn fetch(&self, url: &str) -> CatalogResult<Vec<ModuleDescriptor>> {
        let body = self.transport.get_text(url).await?;
        parse_catalog(self.kind, url, &body)
    }

    /// Fetch every source concurrently
    ///
    /// The result has one list per URL, in URL order. A source that fails
    /// contributes an empty list.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<Vec<ModuleDescriptor>> {
        let futures = urls.iter().map(|url| async move {
            match self.fetch(url).await {
                Ok(list) => {
                    tracing::debug!("Fetched {} entries from {}", list.len(), url);
                    list
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch catalog from {}: {}", url, e);
                    Vec::new()
                }
            }
        });

        join_all(futures).await
    }
}
