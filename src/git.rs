//! Git transport abstraction.
//!
//! Repositories never run git themselves; they go through a [`GitAdapter`].
//! [`CommandGitAdapter`] drives the `git` binary, and tests substitute an
//! adapter that writes files directly.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Clone and inspect remote repositories.
#[async_trait]
pub trait GitAdapter: Send + Sync {
    /// Clone `url` at `branch` into `dest`.
    ///
    /// On failure the returned error's message is reported to the user
    /// unchanged, so it should be the transport's own diagnostic.
    async fn clone_repo(&self, url: &str, branch: &str, dest: &Path, shallow: bool) -> Result<()>;

    /// HEAD commit of the working copy at `path`, or `None` if it cannot be
    /// determined.
    async fn current_commit(&self, path: &Path) -> Result<Option<String>>;

    /// Whether the transport can be used at all (e.g. binary on PATH).
    fn is_available(&self) -> bool;
}

/// [`GitAdapter`] backed by the `git` command-line tool.
#[derive(Debug, Clone, Default)]
pub struct CommandGitAdapter;

impl CommandGitAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GitAdapter for CommandGitAdapter {
    async fn clone_repo(&self, url: &str, branch: &str, dest: &Path, shallow: bool) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.args(["clone", "--branch", branch, "--single-branch"]);
        if shallow {
            cmd.args(["--depth", "1"]);
        }
        cmd.arg(url);
        cmd.arg(dest);

        let output = cmd
            .output()
            .await
            .with_context(|| "Failed to execute 'git clone'. Is git installed?")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git clone failed: {}", stderr.trim());
        }

        Ok(())
    }

    async fn current_commit(&self, path: &Path) -> Result<Option<String>> {
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(path)
            .output()
            .await
            .with_context(|| "Failed to execute 'git rev-parse'")?;

        if !output.status.success() {
            return Ok(None);
        }

        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if sha.is_empty() { None } else { Some(sha) })
    }

    fn is_available(&self) -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}
