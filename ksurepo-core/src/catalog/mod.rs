//! Module catalog aggregation
//!
//! Turns a list of catalog URLs into an observable, progressively
//! enriched list of installable modules.
//!
//! # Architecture
//!
//! ```text
//! catalog URLs
//!     │  SourceFetcher (one request per URL, all awaited)
//!     ▼
//! Vec<Vec<ModuleDescriptor>>
//!     │  merge (visibility filter, first occurrence wins)
//!     ▼
//! CatalogState::Success(placeholders)  ──► watch subscribers
//!     │  ReleaseResolver (one task per module, bounded)
//!     ▼
//! in-place updates via CatalogStateCell::apply_update
//! ```

mod aggregator;
mod descriptor;
mod fetcher;
mod merge;
mod resolver;
mod state;
mod transport;

pub use aggregator::{CatalogAggregator, LoadHandle, LoadOutcome};
pub use descriptor::{
    parse_catalog, CatalogKind, IdentityKey, ModuleDescriptor, UNRESOLVED_VERSION, VISIBLE,
};
pub use fetcher::SourceFetcher;
pub use merge::{merge, search, sorted_for_display};
pub use resolver::{
    extract_tag, extract_zip_path, ReleaseInfo, ReleaseResolver, ScrapingResolver,
};
pub use state::{CatalogState, CatalogStateCell, Snapshot};
pub use transport::{HttpTransport, ReqwestTransport};
