//! Catalog source configuration
//!
//! The ordered list of catalog URLs the user browses, plus the switch
//! that appends the non-free catalog. Persisted as `sources.yaml` in the
//! platform config directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CatalogError;

/// Catalog shipped as the initial (and reset) source
pub const DEFAULT_CATALOG_URL: &str = "https://raw.githubusercontent.com/KernelSU-Next/KernelSU-Next-Modules-Repo/refs/heads/main/modules.json";

/// Appended after the user's sources when non-free modules are enabled
pub const NON_FREE_CATALOG_URL: &str = "https://raw.githubusercontent.com/KernelSU-Next/KernelSU-Next-Modules-Repo/refs/heads/main/non_free_modules.json";

/// Single fixed source for meta-modules
pub const META_CATALOG_URL: &str = "https://raw.githubusercontent.com/KernelSU-Next/KernelSU-Next-Modules-Repo/refs/heads/main/meta_modules.json";

const CONFIG_FILE: &str = "sources.yaml";

/// Persisted source list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Catalog URLs in user order
    #[serde(default)]
    pub urls: Vec<String>,

    /// Append the non-free catalog after `urls`
    #[serde(default)]
    pub include_non_free: bool,

    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            urls: vec![DEFAULT_CATALOG_URL.to_string()],
            include_non_free: false,
            path: None,
        }
    }
}

impl SourceConfig {
    /// Load from the default location
    pub fn load() -> Result<Self> {
        let path = Self::default_config_path()?;
        Self::load_from_path(path)
    }

    /// Load from a specific path; a missing file yields the defaults
    pub fn load_from_path(path: PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read source config: {}", path.display()))?;
            serde_yaml_ng::from_str::<SourceConfig>(&content)
                .with_context(|| format!("Failed to parse source config: {}", path.display()))?
        } else {
            SourceConfig::default()
        };

        config.urls = normalize(config.urls);
        if config.urls.is_empty() {
            tracing::debug!("No catalog sources configured, falling back to default");
            config.urls = vec![DEFAULT_CATALOG_URL.to_string()];
        }

        config.path = Some(path);
        Ok(config)
    }

    /// Write back to the path this config was loaded from
    pub fn save(&self) -> Result<()> {
        let path = match &self.path {
            Some(p) => p.clone(),
            None => Self::default_config_path()?,
        };
        self.save_to_path(&path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml_ng::to_string(self).context("Failed to serialize source config")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write source config: {}", path.display()))?;

        Ok(())
    }

    fn default_config_path() -> Result<PathBuf> {
        let config_dir = directories::ProjectDirs::from("org", "kernelsu-next", "ksurepo")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .or_else(|| dirs::config_dir().map(|d| d.join("ksurepo")))
            .context("Could not determine config directory")?;

        std::fs::create_dir_all(&config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        Ok(config_dir.join(CONFIG_FILE))
    }

    /// URLs to fetch for a load cycle, in merge order
    pub fn effective_urls(&self) -> Vec<String> {
        let mut urls = self.urls.clone();
        if self.include_non_free {
            urls.push(NON_FREE_CATALOG_URL.to_string());
        }
        urls
    }

    pub fn add_url(&mut self, url: &str) -> Result<(), CatalogError> {
        let url = validate_url(url)?;
        if self.urls.iter().any(|u| *u == url) {
            return Err(CatalogError::InvalidSource(format!(
                "'{url}' is already configured"
            )));
        }
        self.urls.push(url);
        Ok(())
    }

    pub fn replace_url(&mut self, index: usize, url: &str) -> Result<(), CatalogError> {
        let url = validate_url(url)?;
        if self
            .urls
            .iter()
            .enumerate()
            .any(|(i, u)| i != index && *u == url)
        {
            return Err(CatalogError::InvalidSource(format!(
                "'{url}' is already configured"
            )));
        }

        let slot = self
            .urls
            .get_mut(index)
            .ok_or_else(|| CatalogError::InvalidSource(format!("No source at index {index}")))?;
        *slot = url;
        Ok(())
    }

    /// Remove a source; the last one cannot be removed
    pub fn remove_url(&mut self, index: usize) -> Result<String, CatalogError> {
        if index >= self.urls.len() {
            return Err(CatalogError::InvalidSource(format!(
                "No source at index {index}"
            )));
        }
        if self.urls.len() == 1 {
            return Err(CatalogError::InvalidSource(
                "At least one catalog source must remain".to_string(),
            ));
        }
        Ok(self.urls.remove(index))
    }

    pub fn reset_to_default(&mut self) {
        self.urls = vec![DEFAULT_CATALOG_URL.to_string()];
    }

    pub fn set_include_non_free(&mut self, enabled: bool) {
        self.include_non_free = enabled;
    }
}

fn validate_url(url: &str) -> Result<String, CatalogError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::InvalidSource("URL is empty".to_string()));
    }
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(CatalogError::InvalidSource(
            "Catalog URL must start with http:// or https://".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn normalize(urls: Vec<String>) -> Vec<String> {
    urls.into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect()
}
