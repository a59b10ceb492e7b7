//! Source catalog and working-copy lifecycle.
//!
//! The manager owns one [`Repository`] per source name, created on first use
//! and reused for the manager's lifetime.

use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, ResolvedSource};
use crate::error::DocsError;
use crate::git::GitAdapter;
use crate::repository::Repository;

pub struct RepositoryManager {
    config: Config,
    base_path: PathBuf,
    git: Arc<dyn GitAdapter>,
    repositories: HashMap<String, Repository>,
}

impl RepositoryManager {
    /// `base_path` is the directory holding one working copy per source.
    pub fn new(config: Config, base_path: PathBuf, git: Arc<dyn GitAdapter>) -> Self {
        Self {
            config,
            base_path,
            git,
            repositories: HashMap::new(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn git(&self) -> &Arc<dyn GitAdapter> {
        &self.git
    }

    /// Validated configuration for `name`.
    pub fn source_config(&self, name: &str) -> Result<ResolvedSource> {
        self.config.source_config(name)
    }

    /// Whether `name` is in the catalog and enabled.
    pub fn has_repository(&self, name: &str) -> bool {
        self.config
            .sources
            .get(name)
            .map(|s| s.enabled)
            .unwrap_or(false)
    }

    pub fn repository(&mut self, name: &str) -> Result<&Repository> {
        let source = self
            .config
            .sources
            .get(name)
            .ok_or_else(|| DocsError::SourceNotConfigured(name.to_string()))?;
        if !source.enabled {
            return Err(DocsError::SourceDisabled(name.to_string()).into());
        }

        if !self.repositories.contains_key(name) {
            let resolved = self.config.source_config(name)?;
            let repo = Repository::new(
                resolved,
                self.base_path.join(name),
                self.config.git.shallow,
                Arc::clone(&self.git),
            );
            self.repositories.insert(name.to_string(), repo);
        }

        Ok(&self.repositories[name])
    }

    /// Repositories for every enabled source.
    pub fn all_repositories(&mut self) -> Result<Vec<&Repository>> {
        let names = self.config.enabled_sources();
        for name in &names {
            self.repository(name)?;
        }
        Ok(names.iter().map(|n| &self.repositories[n]).collect())
    }

    /// Clone `name` if its working copy is missing. Returns whether a clone
    /// happened.
    pub async fn initialize(&mut self, name: &str) -> Result<bool> {
        let repo = self.repository(name)?;
        if repo.exists() {
            tracing::debug!(source = %name, "working copy already present");
            return Ok(false);
        }
        repo.clone_repo().await?;
        Ok(true)
    }

    /// [`initialize`](Self::initialize) every enabled source.
    pub async fn initialize_all(&mut self) -> Result<BTreeMap<String, bool>> {
        let mut results = BTreeMap::new();
        for name in self.config.enabled_sources() {
            let cloned = self.initialize(&name).await?;
            results.insert(name, cloned);
        }
        Ok(results)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingGit {
        clones: AtomicUsize,
    }

    #[async_trait]
    impl GitAdapter for CountingGit {
        async fn clone_repo(
            &self,
            _url: &str,
            _branch: &str,
            dest: &Path,
            _shallow: bool,
        ) -> Result<()> {
            self.clones.fetch_add(1, Ordering::SeqCst);
            std::fs::create_dir_all(dest.join(".git"))?;
            Ok(())
        }

        async fn current_commit(&self, _path: &Path) -> Result<Option<String>> {
            Ok(None)
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn config() -> Config {
        toml::from_str(
            r#"
[sources.alpha]
repository = "https://example.com/alpha.git"
branch = "main"

[sources.beta]
repository = "https://example.com/beta.git"
branch = "main"

[sources.legacy]
enabled = false
repository = "https://example.com/legacy.git"
branch = "main"

[sources.broken]
repository = "https://example.com/broken.git"
"#,
        )
        .unwrap()
    }

    fn manager(tmp: &TempDir) -> (RepositoryManager, Arc<CountingGit>) {
        let git = Arc::new(CountingGit::default());
        let mgr = RepositoryManager::new(config(), tmp.path().to_path_buf(), git.clone());
        (mgr, git)
    }

    #[test]
    fn test_repository_is_cached_per_name() {
        let tmp = TempDir::new().unwrap();
        let (mut mgr, _) = manager(&tmp);

        let first: *const Repository = mgr.repository("alpha").unwrap();
        let second: *const Repository = mgr.repository("alpha").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_repository_errors() {
        let tmp = TempDir::new().unwrap();
        let (mut mgr, _) = manager(&tmp);

        let err = mgr.repository("missing").unwrap_err();
        assert_eq!(
            err.downcast_ref::<DocsError>(),
            Some(&DocsError::SourceNotConfigured("missing".to_string()))
        );

        let err = mgr.repository("legacy").unwrap_err();
        assert_eq!(
            err.downcast_ref::<DocsError>(),
            Some(&DocsError::SourceDisabled("legacy".to_string()))
        );

        let err = mgr.repository("broken").unwrap_err();
        assert!(err.to_string().contains("missing required field 'branch'"));
    }

    #[test]
    fn test_has_repository() {
        let tmp = TempDir::new().unwrap();
        let (mgr, _) = manager(&tmp);
        assert!(mgr.has_repository("alpha"));
        assert!(!mgr.has_repository("legacy"));
        assert!(!mgr.has_repository("missing"));
    }

    #[tokio::test]
    async fn test_initialize_reports_whether_cloned() {
        let tmp = TempDir::new().unwrap();
        let (mut mgr, git) = manager(&tmp);

        assert!(mgr.initialize("alpha").await.unwrap());
        assert!(!mgr.initialize("alpha").await.unwrap());
        assert_eq!(git.clones.load(Ordering::SeqCst), 1);
        assert!(tmp.path().join("alpha").join(".git").is_dir());
    }

    #[tokio::test]
    async fn test_initialize_all_stops_on_invalid_source() {
        let tmp = TempDir::new().unwrap();
        let (mut mgr, _) = manager(&tmp);
        // "broken" is enabled but lacks a branch.
        assert!(mgr.initialize_all().await.is_err());
    }

    #[tokio::test]
    async fn test_initialize_all_enabled_only() {
        let tmp = TempDir::new().unwrap();
        let git = Arc::new(CountingGit::default());
        let mut cfg = config();
        cfg.sources.remove("broken");
        let mut mgr = RepositoryManager::new(cfg, tmp.path().to_path_buf(), git);

        std::fs::create_dir_all(tmp.path().join("beta").join(".git")).unwrap();
        let results = mgr.initialize_all().await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results["alpha"]);
        assert!(!results["beta"]);
        assert!(!results.contains_key("legacy"));
    }

    #[test]
    fn test_all_repositories_enabled_only() {
        let tmp = TempDir::new().unwrap();
        let git = Arc::new(CountingGit::default());
        let mut cfg = config();
        cfg.sources.remove("broken");
        let mut mgr = RepositoryManager::new(cfg, tmp.path().to_path_buf(), git);

        let names: Vec<String> = mgr
            .all_repositories()
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["alpha".to_string(), "beta".to_string()]);
    }
}
