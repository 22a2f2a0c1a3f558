//! Catalog error types

use thiserror::Error;

/// Failures surfaced by the catalog pipeline and its collaborators.
///
/// Only whole-stage failures end up here. Per-source fetch failures and
/// per-module resolution failures are absorbed by the stage that sees
/// them.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The remote answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// The request never produced a response
    #[error("Request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// The catalog body was not a JSON array
    #[error("Catalog at {url} is not a valid JSON array")]
    InvalidCatalog {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Every configured source failed or nothing survived the visibility filter
    #[error("No modules found across all repositories")]
    NoModules,

    /// The fixed meta-module source failed or listed nothing visible
    #[error("Failed to load module list")]
    MetaModulesUnavailable,

    /// A module has no resolved release to download
    #[error("Module '{name}' has no downloadable release")]
    NotDownloadable { name: String },

    /// Another download is still in flight
    #[error("A download for '{name}' is already in progress")]
    DownloadBusy { name: String },

    /// Rejected source configuration change
    #[error("Invalid source configuration: {0}")]
    InvalidSource(String),
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
