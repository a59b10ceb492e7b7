//! Source catalog status.
//!
//! Reports, for every configured source, whether it is enabled, whether a
//! working copy exists, the checked-out commit, and how many documents are
//! indexed for it. Used by `docsearch sources`.

use anyhow::Result;
use serde::Serialize;

use crate::service::DocumentSearchService;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceStatus {
    pub name: String,
    pub enabled: bool,
    pub cloned: bool,
    pub commit: Option<String>,
    pub documents: i64,
    /// Diagnostic notes (e.g. `"missing required field 'branch'"`).
    pub notes: Option<String>,
}

/// Status of every configured source, enabled or not.
pub async fn source_statuses(service: &mut DocumentSearchService) -> Result<Vec<SourceStatus>> {
    let counts = service.engine().document_count_by_source().await?;
    let names: Vec<(String, bool)> = service
        .config()
        .sources
        .iter()
        .map(|(name, s)| (name.clone(), s.enabled))
        .collect();

    let mut statuses = Vec::with_capacity(names.len());
    for (name, enabled) in names {
        let documents = counts.get(&name).copied().unwrap_or(0);

        if !enabled {
            statuses.push(SourceStatus {
                name,
                enabled,
                cloned: false,
                commit: None,
                documents,
                notes: Some("disabled".to_string()),
            });
            continue;
        }

        let status = match service.repositories().repository(&name) {
            Ok(repo) => {
                let commit = match repo.current_commit().await {
                    Ok(commit) => commit,
                    Err(e) => {
                        tracing::warn!(source = %name, error = %e, "could not read commit");
                        None
                    }
                };
                SourceStatus {
                    cloned: repo.exists(),
                    commit,
                    notes: Some(format!("repo: {}", repo.source().repository)),
                    name,
                    enabled,
                    documents,
                }
            }
            Err(e) => SourceStatus {
                name,
                enabled,
                cloned: false,
                commit: None,
                documents,
                notes: Some(e.to_string()),
            },
        };
        statuses.push(status);
    }

    Ok(statuses)
}

/// CLI entry point for `docsearch sources`.
pub async fn list_sources(service: &mut DocumentSearchService) -> Result<()> {
    let statuses = source_statuses(service).await?;

    if !service.repositories().git().is_available() {
        eprintln!("warning: git binary not found on PATH");
    }

    println!(
        "{:<20} {:<8} {:<7} {:>6}  {:<12} NOTES",
        "SOURCE", "ENABLED", "CLONED", "DOCS", "COMMIT"
    );
    for s in &statuses {
        let commit = s
            .commit
            .as_deref()
            .map(|c| c.chars().take(12).collect::<String>())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<20} {:<8} {:<7} {:>6}  {:<12} {}",
            s.name,
            s.enabled,
            s.cloned,
            s.documents,
            commit,
            s.notes.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
