//! Handing resolved modules to a download facility
//!
//! The core only builds the request (URL + suggested file name) and
//! guards against overlapping downloads. Where the bytes end up is the
//! facility's business.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::catalog::ModuleDescriptor;
use crate::config::ClientConfig;
use crate::error::{CatalogError, CatalogResult};

/// What gets handed to the download facility
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub module_name: String,
    pub url: String,
    pub file_name: String,
}

impl DownloadRequest {
    /// Build a request for a resolved module
    pub fn for_module(module: &ModuleDescriptor) -> CatalogResult<Self> {
        if !module.is_downloadable() {
            return Err(CatalogError::NotDownloadable {
                name: module.name.clone(),
            });
        }

        Ok(Self {
            module_name: module.name.clone(),
            url: module.download_url.clone(),
            file_name: module.download_file_name(),
        })
    }
}

/// Where a finished download landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub path: PathBuf,
    pub size: u64,
    /// `sha256:<hex>`
    pub digest: String,
}

/// External download facility
#[async_trait]
pub trait DownloadFacility: Send + Sync {
    async fn download(&self, request: &DownloadRequest) -> Result<DownloadedArtifact>;
}

/// Downloads artifacts over HTTP into a directory
pub struct HttpDownloader {
    client: reqwest::Client,
    output_dir: PathBuf,
}

impl HttpDownloader {
    pub fn new(config: &ClientConfig, output_dir: PathBuf) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Destination for a suggested file name, confined to the output dir
    fn destination(&self, file_name: &str) -> Result<PathBuf> {
        let name = Path::new(file_name)
            .file_name()
            .filter(|n| !n.is_empty())
            .with_context(|| format!("Unusable file name: {file_name:?}"))?;
        Ok(self.output_dir.join(name))
    }
}

#[async_trait]
impl DownloadFacility for HttpDownloader {
    async fn download(&self, request: &DownloadRequest) -> Result<DownloadedArtifact> {
        tracing::info!("Downloading {} from {}", request.module_name, request.url);

        let response = self
            .client
            .get(&request.url)
            .send()
            .await
            .context("Failed to download module")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Download failed: HTTP {} for {}",
                response.status(),
                request.url
            );
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read download response")?;

        let path = self.destination(&request.file_name)?;
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.output_dir.display()))?;
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let artifact = DownloadedArtifact {
            path,
            size: bytes.len() as u64,
            digest: sha256_digest(&bytes),
        };

        tracing::info!(
            "Saved {} to {:?} ({})",
            request.module_name,
            artifact.path,
            artifact.digest
        );

        Ok(artifact)
    }
}

pub fn sha256_digest(bytes: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
}

/// Allows a single download at a time
#[derive(Clone, Default)]
pub struct DownloadGate {
    active: Arc<Mutex<Option<String>>>,
}

/// Held while a download runs; releases the gate on drop
pub struct DownloadSlot {
    active: Arc<Mutex<Option<String>>>,
}

impl Drop for DownloadSlot {
    fn drop(&mut self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        *active = None;
    }
}

impl DownloadGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the module currently downloading, if any
    pub fn active(&self) -> Option<String> {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether a download for `name` may start right now
    pub fn is_enabled_for(&self, name: &str) -> bool {
        match self.active() {
            Some(active) => active == name,
            None => true,
        }
    }

    pub fn try_acquire(&self, name: &str) -> CatalogResult<DownloadSlot> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(current) = active.as_ref() {
            return Err(CatalogError::DownloadBusy {
                name: current.clone(),
            });
        }
        *active = Some(name.to_string());

        Ok(DownloadSlot {
            active: self.active.clone(),
        })
    }
}

/// Dispatch a module to the facility, holding the gate for the duration
///
/// Failures are returned for the caller to report; catalog state is
/// never touched.
pub async fn dispatch(
    facility: &dyn DownloadFacility,
    gate: &DownloadGate,
    module: &ModuleDescriptor,
) -> Result<DownloadedArtifact> {
    let request = DownloadRequest::for_module(module)?;
    let _slot = gate.try_acquire(&module.name)?;

    facility.download(&request).await.map_err(|e| {
        tracing::warn!("Error downloading module {}: {}", module.name, e);
        e
    })
}
