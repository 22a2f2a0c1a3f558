//! ksurepo - browse and download KernelSU modules from module repositories
//!
//! Thin command-line front end over `ksurepo_core`: every command loads
//! the source list, runs one catalog load cycle, and renders the result.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use ksurepo_core::config::{ClientConfig, DEFAULT_MAX_CONCURRENT_RESOLUTIONS};

mod catalog_cli;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "ksurepo",
    about = "Browse and download KernelSU modules from module repositories",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Emit logs as JSON (always on stderr)
    #[clap(long, global = true)]
    log_json: bool,

    /// Override the source list file (defaults to the platform config dir)
    #[clap(long, global = true)]
    sources: Option<PathBuf>,

    /// Maximum release lookups running at once
    #[clap(long, default_value_t = DEFAULT_MAX_CONCURRENT_RESOLUTIONS, global = true)]
    max_concurrent: usize,

    /// Per-request timeout in seconds
    #[clap(long, default_value_t = 30, global = true)]
    timeout_secs: u64,

    /// Build number sent in the User-Agent header
    #[clap(long, global = true)]
    build_number: Option<String>,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::default()
            .with_max_concurrent_resolutions(self.max_concurrent)
            .with_timeout(Duration::from_secs(self.timeout_secs));

        match &self.build_number {
            Some(build) => config.with_build_number(build),
            None => config,
        }
    }
}

#[derive(Parser, Debug)]
enum Command {
    /// List modules from every configured repository
    List {
        /// List meta-modules instead of regular modules
        #[clap(long)]
        meta: bool,

        /// Only show modules whose name, description or author match
        #[clap(long, short)]
        query: Option<String>,

        /// Output results as JSON
        #[clap(long)]
        json: bool,

        /// Skip latest-release lookups
        #[clap(long)]
        no_resolve: bool,
    },

    /// Download the latest release of a module
    Download {
        /// Module name (or id, for meta-modules)
        name: String,

        /// Look the module up in the meta-module catalog
        #[clap(long)]
        meta: bool,

        /// Directory to save the zip into
        #[clap(long, short, default_value = ".")]
        output: PathBuf,
    },

    /// Manage module repositories
    Repo {
        #[clap(subcommand)]
        command: catalog_cli::RepoCommand,
    },
}

/// Initialize tracing with CLI flags
///
/// Logs always go to stderr so stdout stays clean for tables and JSON.
fn initialize_tracing(log_level: &LogLevel, json: bool) {
    let filter = EnvFilter::new(log_level.to_filter_directive());

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, cli.log_json);

    let client = cli.client_config();
    tracing::debug!(?client, "Client configuration");
    let sources = cli.sources.as_deref();

    match cli.command {
        Command::List {
            meta,
            query,
            json,
            no_resolve,
        } => {
            catalog_cli::execute_list(
                sources,
                &client,
                catalog_cli::ListOptions {
                    meta,
                    query,
                    json,
                    no_resolve,
                },
            )
            .await
        }
        Command::Download { name, meta, output } => {
            catalog_cli::execute_download(sources, &client, &name, meta, output).await
        }
        Command::Repo { command } => catalog_cli::execute_repo_command(sources, command),
    }
}
