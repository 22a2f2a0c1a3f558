//! Configuration for catalog sources and the HTTP client

mod client;
mod sources;

pub use client::{
    user_agent_for, ClientConfig, DEFAULT_MAX_CONCURRENT_RESOLUTIONS, DEFAULT_RELEASE_ORIGIN,
    DEFAULT_TIMEOUT, USER_AGENT_PRODUCT,
};
pub use sources::{SourceConfig, DEFAULT_CATALOG_URL, META_CATALOG_URL, NON_FREE_CATALOG_URL};
