//! # docsearch CLI
//!
//! ```bash
//! docsearch --config ./config/docsearch.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docsearch init [source]` | Clone sources that have no working copy |
//! | `docsearch sources` | List configured sources and their status |
//! | `docsearch index [source] [--force]` | Index one or all enabled sources |
//! | `docsearch search "<query>"` | Search indexed documentation |
//! | `docsearch get <id>` | Show a stored document |
//! | `docsearch stats` | Show index statistics |
//! | `docsearch clear [source]` | Remove indexed documents |
//! | `docsearch optimize` | Compact the index |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use docsearch::config::{self, Config};
use docsearch::{get, sources, stats};
use docsearch::{CommandGitAdapter, DocumentSearchService, RepositoryManager, SearchOptions};

#[derive(Parser)]
#[command(
    name = "docsearch",
    about = "Index git-hosted markdown documentation and search it",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docsearch.toml")]
    config: PathBuf,

    /// Search database path, overriding the configuration.
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone sources whose working copy is missing.
    Init {
        /// Only this source.
        source: Option<String>,
    },

    /// List configured sources with clone state, commit and document count.
    Sources,

    /// Index one source, or every enabled source when omitted.
    Index {
        source: Option<String>,

        /// Replace the source's documents instead of upserting.
        #[arg(long)]
        force: bool,
    },

    /// Search indexed documentation.
    Search {
        query: String,

        #[arg(long)]
        limit: Option<i64>,

        /// Restrict to a source (repeatable).
        #[arg(long = "source")]
        sources: Vec<String>,

        /// Prefix-match terms of three or more characters, OR-combined.
        #[arg(long)]
        fuzzy: bool,

        #[arg(long)]
        no_highlight: bool,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show a stored document by id (`source::relative/path.md`).
    Get {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Show document counts.
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Remove indexed documents, for one source or all.
    Clear { source: Option<String> },

    /// Merge index segments.
    Optimize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docsearch=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_or_default(&cli.config)?;
    let git = Arc::new(CommandGitAdapter::new());

    // init only touches working copies; leave the index unopened
    if let Commands::Init { source } = cli.command {
        let base_path = cfg.repositories_path(None);
        let mut repositories = RepositoryManager::new(cfg, base_path, git);
        let results: BTreeMap<String, bool> = match source {
            Some(name) => {
                let cloned = repositories.initialize(&name).await?;
                std::iter::once((name, cloned)).collect()
            }
            None => repositories.initialize_all().await?,
        };
        for (name, cloned) in results {
            if cloned {
                println!("{}: cloned", name);
            } else {
                println!("{}: already present", name);
            }
        }
        return Ok(());
    }

    let mut service = DocumentSearchService::new(cfg, git, cli.index.as_deref()).await?;

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),
        Commands::Sources => {
            sources::list_sources(&mut service).await?;
        }
        Commands::Index { source, force } => {
            let results: BTreeMap<String, usize> = match source {
                Some(name) => {
                    let count = service.index_source(&name, force).await?;
                    std::iter::once((name, count)).collect()
                }
                None => service.index_all(force).await?,
            };
            for (name, count) in &results {
                println!("{}: indexed {} documents", name, count);
            }
            println!("ok");
        }
        Commands::Search {
            query,
            limit,
            sources,
            fuzzy,
            no_highlight,
            json,
        } => {
            let options = SearchOptions {
                limit,
                highlight: if no_highlight { Some(false) } else { None },
                sources,
                fuzzy,
            };
            let results = service.search(&query, options).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No results.");
            } else {
                for (i, r) in results.iter().enumerate() {
                    let title = r.title_highlight.as_deref().unwrap_or(&r.title);
                    println!("{}. [{:.2}] {} / {}", i + 1, r.score, r.source, title);
                    println!("    id: {}", r.id);
                    println!("    file: {}", r.absolute_path);
                    if let Some(snippet) = &r.snippet {
                        println!("    excerpt: \"{}\"", snippet.replace('\n', " ").trim());
                    }
                    println!();
                }
            }
        }
        Commands::Get { id, json } => {
            get::run_get(service.engine(), &id, json).await?;
        }
        Commands::Stats { json } => {
            stats::run_stats(&service, json).await?;
        }
        Commands::Clear { source } => match source {
            Some(name) => {
                let removed = service.clear_source(&name).await?;
                println!("{}: removed {} documents", name, removed);
            }
            None => {
                service.clear_index().await?;
                println!("index cleared");
            }
        },
        Commands::Optimize => {
            service.optimize().await?;
            println!("index optimized");
        }
    }

    Ok(())
}

/// A missing config file at the default location means an empty catalog.
fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}
