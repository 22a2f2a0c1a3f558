//! KernelSU module repository library exports

pub mod catalog;
pub mod config;
pub mod download;
pub mod error;

pub use error::{CatalogError, CatalogResult};
