//! A single documentation source bound to a local working copy.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::config::ResolvedSource;
use crate::error::DocsError;
use crate::git::GitAdapter;

/// Marker directory whose presence means the working copy exists.
const VCS_MARKER: &str = ".git";

pub struct Repository {
    source: ResolvedSource,
    local_path: PathBuf,
    shallow: bool,
    git: Arc<dyn GitAdapter>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.source.name)
            .field("local_path", &self.local_path)
            .finish()
    }
}

impl Repository {
    pub fn new(
        source: ResolvedSource,
        local_path: PathBuf,
        shallow: bool,
        git: Arc<dyn GitAdapter>,
    ) -> Self {
        Self {
            source,
            local_path,
            shallow,
            git,
        }
    }

    pub fn name(&self) -> &str {
        &self.source.name
    }

    pub fn source(&self) -> &ResolvedSource {
        &self.source
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Directory that markdown enumeration is confined to.
    pub fn scan_root(&self) -> PathBuf {
        match &self.source.root {
            Some(root) => self.local_path.join(root),
            None => self.local_path.clone(),
        }
    }

    /// Working-copy-relative path for a root-relative file path.
    pub fn repository_path(&self, relative_path: &str) -> String {
        match &self.source.root {
            Some(root) => format!("{}/{}", root, relative_path),
            None => relative_path.to_string(),
        }
    }

    pub fn exists(&self) -> bool {
        self.local_path.join(VCS_MARKER).is_dir()
    }

    /// Clone the source unless a working copy is already present.
    pub async fn clone_repo(&self) -> Result<()> {
        if self.exists() {
            return Ok(());
        }

        if let Some(parent) = self.local_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create repository directory: {}", parent.display())
            })?;
        }

        tracing::info!(
            source = %self.source.name,
            url = %self.source.repository,
            branch = %self.source.branch,
            "cloning documentation source"
        );

        self.git
            .clone_repo(
                &self.source.repository,
                &self.source.branch,
                &self.local_path,
                self.shallow,
            )
            .await
            .map_err(|e| DocsError::CloneFailed {
                source_name: self.source.name.clone(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    /// Every `*.md` file under the scan root as sorted, root-relative,
    /// forward-slash paths. Empty when the working copy is missing.
    pub fn markdown_files(&self) -> Result<Vec<String>> {
        if !self.exists() {
            return Ok(Vec::new());
        }

        let scan_root = self.scan_root();
        if !scan_root.is_dir() {
            tracing::warn!(
                source = %self.source.name,
                root = %scan_root.display(),
                "source root does not exist in working copy"
            );
            return Ok(Vec::new());
        }

        let exclude_set = build_exclude_set(&self.source.exclude)?;
        let mut files = Vec::new();

        let walker = WalkDir::new(&scan_root)
            .into_iter()
            .filter_entry(|e| e.file_name() != VCS_MARKER);
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if !entry.file_name().to_string_lossy().ends_with(".md") {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&scan_root).unwrap_or(path);
            let rel_str = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if exclude_set.is_match(&rel_str) {
                continue;
            }
            files.push(rel_str);
        }

        files.sort();
        Ok(files)
    }

    /// Contents of a root-relative file, or `None` if it is missing or
    /// cannot be read.
    pub fn read_file(&self, relative_path: &str) -> Result<Option<String>> {
        let path = self.scan_root().join(relative_path);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                tracing::warn!(
                    source = %self.source.name,
                    file = %path.display(),
                    error = %e,
                    "skipping unreadable file"
                );
                Ok(None)
            }
        }
    }

    /// HEAD commit, or `None` without a working copy.
    pub async fn current_commit(&self) -> Result<Option<String>> {
        if !self.exists() {
            return Ok(None);
        }
        self.git.current_commit(&self.local_path).await
    }
}

fn build_exclude_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    builder.add(Glob::new("**/.git/**")?);
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
