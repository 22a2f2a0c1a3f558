//! Catalog CLI commands
//!
//! Listing, downloading, and managing the repositories modules are
//! aggregated from.

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use ksurepo_core::catalog::{
    search, sorted_for_display, CatalogAggregator, CatalogKind, CatalogState, LoadOutcome,
    ModuleDescriptor, UNRESOLVED_VERSION,
};
use ksurepo_core::config::{ClientConfig, SourceConfig, NON_FREE_CATALOG_URL};
use ksurepo_core::download::{dispatch, DownloadGate, HttpDownloader};

#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// List configured repositories
    List,

    /// Add a repository (must serve a JSON module list)
    Add {
        /// Repository URL
        url: String,
    },

    /// Replace the repository at a position shown by `repo list`
    Edit {
        /// Position (1-based)
        index: usize,
        /// New repository URL
        url: String,
    },

    /// Remove the repository at a position shown by `repo list`
    Remove {
        /// Position (1-based)
        index: usize,
    },

    /// Restore the default repository list
    Reset,

    /// Include or exclude the non-free module repository
    NonFree {
        #[clap(value_enum)]
        state: Toggle,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

pub struct ListOptions {
    pub meta: bool,
    pub query: Option<String>,
    pub json: bool,
    pub no_resolve: bool,
}

fn load_sources(path: Option<&Path>) -> Result<SourceConfig> {
    match path {
        Some(path) => SourceConfig::load_from_path(path.to_path_buf()),
        None => SourceConfig::load(),
    }
}

fn catalog_kind(meta: bool) -> CatalogKind {
    if meta {
        CatalogKind::MetaModules
    } else {
        CatalogKind::Modules
    }
}

/// Run one load cycle and return the aggregator holding its state
async fn load_catalog(
    sources_path: Option<&Path>,
    client: &ClientConfig,
    kind: CatalogKind,
    resolve: bool,
) -> Result<CatalogAggregator> {
    let sources = load_sources(sources_path)?;
    let aggregator = CatalogAggregator::new(kind, client)?;

    let urls = aggregator.urls_for(&sources);
    eprintln!("Fetching {} repository index(es)...", urls.len());

    let handle = aggregator.load(&urls).await;
    match handle.outcome() {
        LoadOutcome::Listed(count) if resolve => {
            eprintln!("Resolving latest releases for {count} module(s)...");
            handle.wait().await;
        }
        LoadOutcome::Listed(_) => {}
        LoadOutcome::NoModules | LoadOutcome::Superseded => {
            if let CatalogState::Error(message) = aggregator.current() {
                anyhow::bail!(message);
            }
        }
    }

    Ok(aggregator)
}

/// Table row for listed modules
#[derive(Tabled)]
struct ModuleRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Description")]
    description: String,
}

fn version_display(module: &ModuleDescriptor) -> String {
    if module.is_loading {
        "-".to_string()
    } else if module.latest_version == UNRESOLVED_VERSION {
        "no release".to_string()
    } else {
        module.latest_version.clone()
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

pub async fn execute_list(
    sources_path: Option<&Path>,
    client: &ClientConfig,
    options: ListOptions,
) -> Result<()> {
    let aggregator = load_catalog(
        sources_path,
        client,
        catalog_kind(options.meta),
        !options.no_resolve,
    )
    .await?;

    let state = aggregator.current();
    let modules = sorted_for_display(state.modules().unwrap_or_default());
    let results = search(&modules, options.query.as_deref().unwrap_or(""));

    if options.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("\nNo modules found.");
        return Ok(());
    }

    println!("\nFound {} module(s):\n", results.len());

    let table_rows: Vec<ModuleRow> = results
        .iter()
        .map(|module| ModuleRow {
            name: module.name.clone(),
            version: version_display(module),
            author: module.author.clone(),
            description: truncate(&module.description, 50),
        })
        .collect();

    let table = Table::new(&table_rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();

    println!("{table}");

    Ok(())
}

pub async fn execute_download(
    sources_path: Option<&Path>,
    client: &ClientConfig,
    name: &str,
    meta: bool,
    output: PathBuf,
) -> Result<()> {
    let aggregator = load_catalog(sources_path, client, catalog_kind(meta), true).await?;

    let state = aggregator.current();
    let modules = state.modules().unwrap_or_default();
    let module = modules
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(name) || (meta && m.id == name))
        .with_context(|| format!("Module '{name}' not found in any repository"))?;

    let downloader = HttpDownloader::new(client, output)?;
    println!(
        "Downloading {} {} to {}...",
        module.name,
        module.latest_version,
        downloader.output_dir().display()
    );

    let artifact = dispatch(&downloader, &DownloadGate::new(), module).await?;

    println!("Saved:   {}", artifact.path.display());
    println!("Size:    {} bytes", artifact.size);
    println!("Digest:  {}", artifact.digest);

    Ok(())
}

/// Table row for configured repositories
#[derive(Tabled)]
struct RepoRow {
    #[tabled(rename = "#")]
    position: String,
    #[tabled(rename = "URL")]
    url: String,
}

fn position_to_index(position: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .context("Repository positions start at 1")
}

pub fn execute_repo_command(sources_path: Option<&Path>, command: RepoCommand) -> Result<()> {
    let mut sources = load_sources(sources_path)?;

    match command {
        RepoCommand::List => {
            let mut rows: Vec<RepoRow> = sources
                .urls
                .iter()
                .enumerate()
                .map(|(i, url)| RepoRow {
                    position: (i + 1).to_string(),
                    url: url.clone(),
                })
                .collect();
            if sources.include_non_free {
                rows.push(RepoRow {
                    position: "non-free".to_string(),
                    url: NON_FREE_CATALOG_URL.to_string(),
                });
            }

            let table = Table::new(&rows).with(Style::rounded()).to_string();
            println!("{table}");
            return Ok(());
        }
        RepoCommand::Add { url } => {
            sources.add_url(&url)?;
            println!("Added repository {}", url.trim());
        }
        RepoCommand::Edit { index, url } => {
            sources.replace_url(position_to_index(index)?, &url)?;
            println!("Repository {index} -> {}", url.trim());
        }
        RepoCommand::Remove { index } => {
            let removed = sources.remove_url(position_to_index(index)?)?;
            println!("Removed repository {removed}");
        }
        RepoCommand::Reset => {
            sources.reset_to_default();
            println!("Restored the default repository list");
        }
        RepoCommand::NonFree { state } => {
            let enabled = matches!(state, Toggle::On);
            sources.set_include_non_free(enabled);
            println!(
                "Non-free modules {}",
                if enabled { "enabled" } else { "disabled" }
            );
        }
    }

    sources.save()
}
