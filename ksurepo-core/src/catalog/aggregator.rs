//! Load-cycle orchestration
//!
//! A load cycle fetches every source (barrier), merges, publishes the
//! placeholder list, then spawns one resolution task per module. The
//! cycle returns as soon as the tasks are spawned; their results stream
//! into the state cell as they arrive.

use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle};

use super::descriptor::{CatalogKind, ModuleDescriptor};
use super::fetcher::SourceFetcher;
use super::merge::merge;
use super::resolver::{ReleaseResolver, ScrapingResolver};
use super::state::{CatalogState, CatalogStateCell, Snapshot};
use super::transport::{HttpTransport, ReqwestTransport};
use crate::config::{ClientConfig, SourceConfig, META_CATALOG_URL};
use crate::error::CatalogError;

/// How a load cycle ended its synchronous part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The merged list was published and this many resolutions were started
    Listed(usize),
    /// Nothing survived the merge; the state is `Error`
    NoModules,
    /// A newer cycle started before this one could publish
    Superseded,
}

/// Handle on the resolution tasks of one load cycle
pub struct LoadHandle {
    generation: u64,
    outcome: LoadOutcome,
    tasks: Vec<JoinHandle<()>>,
}

impl LoadHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn outcome(&self) -> LoadOutcome {
        self.outcome
    }

    /// Wait for every resolution task of this cycle to finish or be cancelled
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::warn!("Release resolution task failed: {}", e);
                }
            }
        }
    }
}

/// Tasks belonging to the current cycle
struct InFlight {
    generation: u64,
    handles: Vec<AbortHandle>,
}

/// Aggregates catalog sources into an observable, progressively resolved list
pub struct CatalogAggregator {
    fetcher: SourceFetcher,
    resolver: Arc<dyn ReleaseResolver>,
    state: Arc<CatalogStateCell>,
    limiter: Arc<Semaphore>,
    in_flight: Mutex<InFlight>,
}

impl CatalogAggregator {
    /// Aggregator backed by reqwest and the scraping resolver
    pub fn new(kind: CatalogKind, config: &ClientConfig) -> anyhow::Result<Self> {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(config)?);
        let resolver = Arc::new(ScrapingResolver::with_origin(
            transport.clone(),
            &config.release_origin,
        ));

        Ok(Self::with_parts(
            SourceFetcher::new(transport, kind),
            resolver,
            config.max_concurrent_resolutions,
        ))
    }

    /// Aggregator from explicit collaborators
    pub fn with_parts(
        fetcher: SourceFetcher,
        resolver: Arc<dyn ReleaseResolver>,
        max_concurrent_resolutions: usize,
    ) -> Self {
        Self {
            fetcher,
            resolver,
            state: Arc::new(CatalogStateCell::new()),
            limiter: Arc::new(Semaphore::new(max_concurrent_resolutions.max(1))),
            in_flight: Mutex::new(InFlight {
                generation: 0,
                handles: Vec::new(),
            }),
        }
    }

    pub fn kind(&self) -> CatalogKind {
        self.fetcher.kind()
    }

    pub fn state(&self) -> Arc<CatalogStateCell> {
        self.state.clone()
    }

    pub fn current(&self) -> CatalogState {
        self.state.get()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    /// Source list for this aggregator's catalog kind
    pub fn urls_for(&self, sources: &SourceConfig) -> Vec<String> {
        match self.kind() {
            CatalogKind::Modules => sources.effective_urls(),
            CatalogKind::MetaModules => vec![META_CATALOG_URL.to_string()],
        }
    }

    /// Run a load cycle against the configured sources
    pub async fn load_from_config(&self, sources: &SourceConfig) -> LoadHandle {
        let urls = self.urls_for(sources);
        self.load(&urls).await
    }

    /// Run a load cycle, superseding any cycle still in flight
    pub async fn load(&self, urls: &[String]) -> LoadHandle {
        let generation = self.begin_cycle();
        tracing::info!(
            "Loading {} catalog source(s) (generation {})",
            urls.len(),
            generation
        );

        let lists = self.fetcher.fetch_all(urls).await;
        let merged = merge(lists);

        if merged.is_empty() {
            tracing::info!("No visible modules after merge (generation {})", generation);
            let error = match self.kind() {
                CatalogKind::Modules => CatalogError::NoModules,
                CatalogKind::MetaModules => CatalogError::MetaModulesUnavailable,
            };
            let outcome = if self.state.publish_error(generation, error.to_string()) {
                LoadOutcome::NoModules
            } else {
                LoadOutcome::Superseded
            };
            return LoadHandle {
                generation,
                outcome,
                tasks: Vec::new(),
            };
        }

        let placeholders: Vec<ModuleDescriptor> = merged
            .into_iter()
            .map(ModuleDescriptor::into_placeholder)
            .collect();

        if !self
            .state
            .publish_success(generation, placeholders.clone())
        {
            return LoadHandle {
                generation,
                outcome: LoadOutcome::Superseded,
                tasks: Vec::new(),
            };
        }

        tracing::info!(
            "Listed {} module(s), resolving releases via {} (generation {})",
            placeholders.len(),
            self.resolver.name(),
            generation
        );

        let count = placeholders.len();
        let tasks: Vec<JoinHandle<()>> = placeholders
            .into_iter()
            .map(|module| self.spawn_resolution(generation, module))
            .collect();

        self.register(generation, &tasks);

        LoadHandle {
            generation,
            outcome: LoadOutcome::Listed(count),
            tasks,
        }
    }

    /// Abort every outstanding resolution task
    pub fn cancel(&self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        for handle in in_flight.handles.drain(..) {
            handle.abort();
        }
    }

    fn begin_cycle(&self) -> u64 {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());

        let generation = self.state.begin_cycle();
        if !in_flight.handles.is_empty() {
            tracing::debug!(
                "Cancelling {} resolution task(s) from generation {}",
                in_flight.handles.len(),
                in_flight.generation
            );
        }
        for handle in in_flight.handles.drain(..) {
            handle.abort();
        }
        in_flight.generation = generation;

        generation
    }

    fn register(&self, generation: u64, tasks: &[JoinHandle<()>]) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());

        if in_flight.generation != generation {
            for task in tasks {
                task.abort();
            }
            return;
        }

        in_flight
            .handles
            .extend(tasks.iter().map(JoinHandle::abort_handle));
    }

    fn spawn_resolution(&self, generation: u64, module: ModuleDescriptor) -> JoinHandle<()> {
        let resolver = self.resolver.clone();
        let state = self.state.clone();
        let limiter = self.limiter.clone();

        tokio::spawn(async move {
            // closed only if the aggregator is torn down
            let Ok(_permit) = limiter.acquire_owned().await else {
                return;
            };

            let release = resolver.resolve_latest_release(&module.repo_url).await;
            match &release {
                Some(info) => tracing::debug!("Resolved {} -> {}", module.name, info.version),
                None => tracing::debug!("No release for {}", module.name),
            }

            state.apply_update(generation, module.resolved(release));
        })
    }
}

impl Drop for CatalogAggregator {
    fn drop(&mut self) {
        self.cancel();
    }
}
