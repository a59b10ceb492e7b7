//! TOML configuration parsing and path resolution.
//!
//! A configuration file declares the documentation source catalog plus a
//! handful of index and git settings:
//!
//! ```toml
//! cache_dir = "./.docsearch"
//!
//! [index]
//! default_limit = 20
//! highlight = true
//!
//! [sources.cakephp]
//! repository = "https://github.com/cakephp/docs-md.git"
//! branch = "5.x"
//! root = "docs/en"
//! ```
//!
//! Storage locations are resolved once through [`resolve_path`], which takes
//! candidates in precedence order and falls back to the process temp dir.

use anyhow::{Context, Result};
use globset::Glob;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::DocsError;

/// Directory name used under the system temp dir when nothing is configured.
const TEMP_DIR_NAME: &str = "docsearch";
const INDEX_FILE_NAME: &str = "search.sqlite";
const SOURCES_DIR_NAME: &str = "sources";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Search database override.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Working-copy base directory override.
    #[serde(default)]
    pub repositories_path: Option<PathBuf>,
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    #[serde(default = "default_highlight")]
    pub highlight: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: None,
            repositories_path: None,
            default_limit: default_limit(),
            highlight: default_highlight(),
        }
    }
}

fn default_limit() -> i64 {
    20
}
fn default_highlight() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct GitConfig {
    #[serde(default = "default_shallow")]
    pub shallow: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            shallow: default_shallow(),
        }
    }
}

fn default_shallow() -> bool {
    true
}

/// One entry of the source catalog.
///
/// `repository` and `branch` are optional at parse time so a malformed entry
/// does not prevent the rest of the catalog from loading; they are enforced
/// by [`Config::source_config`].
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

/// A source entry that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub name: String,
    pub repository: String,
    pub branch: String,
    pub root: Option<String>,
    pub exclude: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl Config {
    /// Validate and return the configuration for `name`.
    ///
    /// Fails with [`DocsError::SourceNotConfigured`] when the name is unknown
    /// and [`DocsError::MissingField`] when `repository` or `branch` is absent
    /// or blank. The enabled flag is not checked here.
    pub fn source_config(&self, name: &str) -> Result<ResolvedSource> {
        let source = self
            .sources
            .get(name)
            .ok_or_else(|| DocsError::SourceNotConfigured(name.to_string()))?;

        let repository = required(name, "repository", source.repository.as_deref())?;
        let branch = required(name, "branch", source.branch.as_deref())?;

        let root = source
            .root
            .as_deref()
            .map(|r| r.trim_matches('/').to_string())
            .filter(|r| !r.is_empty() && r != ".");

        Ok(ResolvedSource {
            name: name.to_string(),
            repository,
            branch,
            root,
            exclude: source.exclude.clone(),
            metadata: source.metadata.clone(),
        })
    }

    /// Names of all enabled sources, in catalog order.
    pub fn enabled_sources(&self) -> Vec<String> {
        self.sources
            .iter()
            .filter(|(_, s)| s.enabled)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Base directory for working copies: explicit > `index.repositories_path`
    /// > `<cache_dir>/sources` > `<tmp>/docsearch/sources`.
    pub fn repositories_path(&self, explicit: Option<&Path>) -> PathBuf {
        resolve_path(
            [
                explicit.map(Path::to_path_buf),
                self.index.repositories_path.clone(),
                self.cache_dir.as_ref().map(|d| d.join(SOURCES_DIR_NAME)),
            ],
            std::env::temp_dir()
                .join(TEMP_DIR_NAME)
                .join(SOURCES_DIR_NAME),
        )
    }

    /// Search database location: explicit > `index.path`
    /// > `<cache_dir>/search.sqlite` > `<tmp>/docsearch/search.sqlite`.
    pub fn index_path(&self, explicit: Option<&Path>) -> PathBuf {
        resolve_path(
            [
                explicit.map(Path::to_path_buf),
                self.index.path.clone(),
                self.cache_dir.as_ref().map(|d| d.join(INDEX_FILE_NAME)),
            ],
            std::env::temp_dir()
                .join(TEMP_DIR_NAME)
                .join(INDEX_FILE_NAME),
        )
    }
}

fn required(source: &str, field: &str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(DocsError::missing_field(source, field).into()),
    }
}

/// Return the first present candidate, or `fallback` when none is set.
pub fn resolve_path<I>(candidates: I, fallback: PathBuf) -> PathBuf
where
    I: IntoIterator<Item = Option<PathBuf>>,
{
    candidates.into_iter().flatten().next().unwrap_or(fallback)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.index.default_limit < 1 {
        return Err(DocsError::InvalidConfig("index.default_limit must be >= 1".to_string()).into());
    }

    for (name, source) in &config.sources {
        for pattern in &source.exclude {
            Glob::new(pattern).map_err(|e| {
                DocsError::InvalidConfig(format!(
                    "sources.{}.exclude: invalid glob '{}': {}",
                    name, pattern, e
                ))
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Config {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_defaults_when_sections_absent() {
        let config = parse("");
        assert_eq!(config.index.default_limit, 20);
        assert!(config.index.highlight);
        assert!(config.git.shallow);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_source_config_requires_repository() {
        let config = parse(
            r#"
[sources.docs]
branch = "main"
"#,
        );
        let err = config.source_config("docs").unwrap_err();
        assert_eq!(
            err.downcast_ref::<DocsError>(),
            Some(&DocsError::missing_field("docs", "repository"))
        );
    }

    #[test]
    fn test_source_config_requires_branch() {
        let config = parse(
            r#"
[sources.docs]
repository = "https://example.com/docs.git"
"#,
        );
        let err = config.source_config("docs").unwrap_err();
        assert!(err.to_string().contains("'branch'"));
    }

    #[test]
    fn test_source_config_unknown_name() {
        let config = parse("");
        let err = config.source_config("nope").unwrap_err();
        assert_eq!(
            err.downcast_ref::<DocsError>(),
            Some(&DocsError::SourceNotConfigured("nope".to_string()))
        );
    }

    #[test]
    fn test_source_root_is_normalized() {
        let config = parse(
            r#"
[sources.docs]
repository = "https://example.com/docs.git"
branch = "main"
root = "/docs/en/"
"#,
        );
        let source = config.source_config("docs").unwrap();
        assert_eq!(source.root.as_deref(), Some("docs/en"));
    }

    #[test]
    fn test_enabled_sources_skips_disabled() {
        let config = parse(
            r#"
[sources.a]
repository = "https://example.com/a.git"
branch = "main"

[sources.b]
enabled = false
repository = "https://example.com/b.git"
branch = "main"
"#,
        );
        assert_eq!(config.enabled_sources(), vec!["a".to_string()]);
    }

    #[test]
    fn test_index_path_precedence() {
        let mut config = parse(r#"cache_dir = "/var/cache/docs""#);
        assert_eq!(
            config.index_path(None),
            PathBuf::from("/var/cache/docs/search.sqlite")
        );

        config.index.path = Some(PathBuf::from("/data/index.sqlite"));
        assert_eq!(config.index_path(None), PathBuf::from("/data/index.sqlite"));

        let explicit = PathBuf::from("/tmp/explicit.sqlite");
        assert_eq!(config.index_path(Some(&explicit)), explicit);
    }

    #[test]
    fn test_repositories_path_falls_back_to_temp() {
        let config = parse("");
        assert_eq!(
            config.repositories_path(None),
            std::env::temp_dir().join("docsearch").join("sources")
        );
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let config = parse(
            r#"
[index]
default_limit = 0
"#,
        );
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_glob() {
        let config = parse(
            r#"
[sources.docs]
repository = "https://example.com/docs.git"
branch = "main"
exclude = ["[unclosed"]
"#,
        );
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("sources.docs.exclude"));
    }
}
