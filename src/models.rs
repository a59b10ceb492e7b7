//! Core data models shared by the processor, the search engine, and the
//! service layer.
//!
//! These are the exchange formats between components: the processor emits
//! [`DocumentRecord`]s, the engine stores them and answers with
//! [`SearchResult`]s.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Indexable representation of one markdown file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// `source::relative_path`; the upsert key.
    pub id: String,
    pub source: String,
    /// Path inside the working copy (includes the source `root`).
    pub path: String,
    /// Path relative to the source root, forward-slash separated.
    pub relative_path: String,
    pub title: String,
    pub headings: Vec<String>,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

/// Options accepted by [`SearchEngine::search`](crate::search::SearchEngine::search).
///
/// `None` fields fall back to configured defaults.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub limit: Option<i64>,
    pub highlight: Option<bool>,
    /// Restrict to these sources. Empty means all.
    pub sources: Vec<String>,
    pub fuzzy: bool,
}

/// One ranked hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub source: String,
    pub path: String,
    pub title: String,
    pub title_highlight: Option<String>,
    pub snippet: Option<String>,
    pub score: f64,
    pub metadata: BTreeMap<String, String>,
    /// `<base_path>/<source>/<path>`, where `path` is relative to the working
    /// copy (source root included), so it names the file on disk.
    pub absolute_path: String,
}

/// Combined view of index contents and the configured catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total_documents: i64,
    pub documents_by_source: BTreeMap<String, i64>,
    pub sources: Vec<String>,
}
