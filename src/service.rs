//! Indexing and search orchestration.
//!
//! The service wires the [`RepositoryManager`], the processor, and the
//! [`SearchEngine`] together:
//!
//! ```text
//! RepositoryManager ──▶ Repository ──▶ markdown files
//!                                         │
//!                                         ▼
//!                          processor::process_batch
//!                                         │
//!                                         ▼
//!                                  SearchEngine ◀── search / stats
//! ```

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::git::GitAdapter;
use crate::models::{SearchOptions, SearchResult, Statistics};
use crate::processor;
use crate::repository_manager::RepositoryManager;
use crate::search::SearchEngine;

pub struct DocumentSearchService {
    config: Config,
    repositories: RepositoryManager,
    engine: SearchEngine,
}

impl DocumentSearchService {
    /// Open the index and set up the source catalog.
    ///
    /// `index_path` overrides the configured search database location.
    pub async fn new(
        config: Config,
        git: Arc<dyn GitAdapter>,
        index_path: Option<&Path>,
    ) -> Result<Self> {
        let db_path = config.index_path(index_path);
        let base_path = config.repositories_path(None);

        let engine = SearchEngine::open(&db_path, base_path.clone(), config.index.default_limit).await?;
        let repositories = RepositoryManager::new(config.clone(), base_path, git);

        Ok(Self {
            config,
            repositories,
            engine,
        })
    }

    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    pub fn repositories(&mut self) -> &mut RepositoryManager {
        &mut self.repositories
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Search with configured defaults filled in for `limit` and `highlight`.
    pub async fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let options = SearchOptions {
            limit: options.limit.or(Some(self.config.index.default_limit)),
            highlight: options.highlight.or(Some(self.config.index.highlight)),
            ..options
        };
        self.engine.search(query, &options).await
    }

    /// Fetch (if needed), process and index every markdown file of `name`.
    ///
    /// With `force`, the source's previous documents are replaced by exactly
    /// the new set; otherwise documents are upserted by id.
    pub async fn index_source(&mut self, name: &str, force: bool) -> Result<usize> {
        self.repositories.initialize(name).await?;
        let repo = self.repositories.repository(name)?;

        let files = repo.markdown_files()?;
        if files.is_empty() {
            tracing::info!(source = %name, "no markdown files found");
        }

        let records = processor::process_batch(repo, &files)?;

        let indexed = if force {
            self.engine.replace_source(name, &records).await?
        } else {
            self.engine.index_batch(&records).await?
        };

        tracing::info!(source = %name, documents = indexed, force, "source indexed");
        Ok(indexed)
    }

    /// [`index_source`](Self::index_source) for every enabled source.
    pub async fn index_all(&mut self, force: bool) -> Result<BTreeMap<String, usize>> {
        let mut results = BTreeMap::new();
        for name in self.config.enabled_sources() {
            let count = self.index_source(&name, force).await?;
            results.insert(name, count);
        }
        Ok(results)
    }

    pub async fn statistics(&self) -> Result<Statistics> {
        Ok(Statistics {
            total_documents: self.engine.document_count().await?,
            documents_by_source: self.engine.document_count_by_source().await?,
            sources: self.config.enabled_sources(),
        })
    }

    pub async fn clear_index(&self) -> Result<()> {
        self.engine.clear().await
    }

    pub async fn clear_source(&self, name: &str) -> Result<u64> {
        self.engine.clear_source(name).await
    }

    pub async fn optimize(&self) -> Result<()> {
        self.engine.optimize().await
    }

    pub fn has_repository(&self, name: &str) -> bool {
        self.repositories.has_repository(name)
    }

    /// Clone every enabled source that has no working copy yet.
    pub async fn initialize_repositories(&mut self) -> Result<BTreeMap<String, bool>> {
        self.repositories.initialize_all().await
    }
}
