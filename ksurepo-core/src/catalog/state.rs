//! Observable catalog state
//!
//! The state lives in a single `watch` channel. Every mutation goes
//! through `send_if_modified`, which holds the channel's write lock for
//! the whole read-modify-publish, so concurrent resolution tasks cannot
//! lose each other's updates.
//!
//! Each load cycle gets a new generation. Writes tagged with an older
//! generation are dropped.

use serde::Serialize;
use tokio::sync::watch;

use super::descriptor::ModuleDescriptor;

/// What the view layer renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum CatalogState {
    Loading,
    Success(Vec<ModuleDescriptor>),
    Error(String),
}

impl CatalogState {
    pub fn is_loading(&self) -> bool {
        matches!(self, CatalogState::Loading)
    }

    /// Modules of a `Success` state
    pub fn modules(&self) -> Option<&[ModuleDescriptor]> {
        match self {
            CatalogState::Success(modules) => Some(modules),
            _ => None,
        }
    }

    /// Number of modules still waiting for release resolution
    pub fn pending_resolutions(&self) -> usize {
        self.modules()
            .map(|m| m.iter().filter(|d| d.is_loading).count())
            .unwrap_or(0)
    }
}

/// State plus the load cycle that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub generation: u64,
    pub state: CatalogState,
}

/// Single shared cell holding the current catalog state
pub struct CatalogStateCell {
    tx: watch::Sender<Snapshot>,
}

impl Default for CatalogStateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStateCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot {
            generation: 0,
            state: CatalogState::Loading,
        });
        Self { tx }
    }

    /// Current state
    pub fn get(&self) -> CatalogState {
        self.tx.borrow().state.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    pub fn generation(&self) -> u64 {
        self.tx.borrow().generation
    }

    /// Receiver notified on every published change
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    /// Start a new load cycle: bump the generation and publish `Loading`
    pub fn begin_cycle(&self) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|snapshot| {
            snapshot.generation += 1;
            snapshot.state = CatalogState::Loading;
            generation = snapshot.generation;
        });
        generation
    }

    /// Publish the merged placeholder list
    ///
    /// Returns false if `generation` has been superseded.
    pub fn publish_success(&self, generation: u64, modules: Vec<ModuleDescriptor>) -> bool {
        self.publish(generation, CatalogState::Success(modules))
    }

    /// Publish a terminal error for the cycle
    pub fn publish_error(&self, generation: u64, message: impl Into<String>) -> bool {
        self.publish(generation, CatalogState::Error(message.into()))
    }

    fn publish(&self, generation: u64, state: CatalogState) -> bool {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.generation != generation {
                tracing::debug!(
                    "Dropping stale publish from generation {} (current {})",
                    generation,
                    snapshot.generation
                );
                return false;
            }
            snapshot.state = state;
            true
        })
    }

    /// Merge one resolved descriptor into the current list
    ///
    /// Replaces the entry with the same identity key, or appends it when
    /// absent. Dropped when the generation is stale or the state is not
    /// `Success`.
    pub fn apply_update(&self, generation: u64, updated: ModuleDescriptor) -> bool {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.generation != generation {
                tracing::debug!(
                    "Dropping stale update for '{}' from generation {}",
                    updated.name,
                    generation
                );
                return false;
            }

            let CatalogState::Success(modules) = &mut snapshot.state else {
                return false;
            };

            let key = updated.identity_key();
            match modules.iter_mut().find(|m| m.identity_key() == key) {
                Some(slot) => *slot = updated,
                None => modules.push(updated),
            }
            true
        })
    }
}
