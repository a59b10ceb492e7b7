//! Persistent full-text index over [`DocumentRecord`]s.
//!
//! Backed by a single SQLite file with an FTS5 table. Ranking uses FTS5's
//! `bm25()` with titles weighted above headings, and headings above body
//! text. Scores are reported negated so that larger is better.
//!
//! # Lifecycle
//!
//! [`SearchEngine::open`] creates the file and schema. The engine can then
//! index and query freely until [`SearchEngine::destroy`] closes the
//! connection and deletes the backing files.

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::db;
use crate::migrate;
use crate::models::{DocumentRecord, SearchOptions, SearchResult};
use crate::query::build_match_expression;

/// bm25 column weights: title, headings, content.
const BM25_WEIGHTS: (f64, f64, f64) = (10.0, 5.0, 1.0);
const HIGHLIGHT_OPEN: &str = "<mark>";
const HIGHLIGHT_CLOSE: &str = "</mark>";
const SNIPPET_ELLIPSIS: &str = "...";
const SNIPPET_TOKENS: i64 = 32;

pub struct SearchEngine {
    pool: SqlitePool,
    db_path: PathBuf,
    base_path: PathBuf,
    default_limit: i64,
}

impl SearchEngine {
    /// Open or create the index at `db_path`.
    ///
    /// `base_path` is where working copies live and is used to compute each
    /// hit's `absolute_path`.
    ///
    /// # Errors
    ///
    /// Fails with [`DocsError::FullTextUnsupported`](crate::error::DocsError::FullTextUnsupported)
    /// if SQLite has no FTS5 module.
    pub async fn open(db_path: &Path, base_path: PathBuf, default_limit: i64) -> Result<Self> {
        let pool = db::connect(db_path).await?;
        migrate::run_migrations(&pool).await?;

        tracing::debug!(path = %db_path.display(), "search index opened");

        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
            base_path,
            default_limit,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Insert or replace a single document by id.
    pub async fn index_document(&self, doc: &DocumentRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        upsert(&mut tx, doc).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Insert or replace every document in one transaction.
    ///
    /// Either all documents are committed or, on error, none are.
    pub async fn index_batch(&self, docs: &[DocumentRecord]) -> Result<usize> {
        if docs.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for doc in docs {
            upsert(&mut tx, doc)
                .await
                .with_context(|| format!("Failed to index document: {}", doc.id))?;
        }
        tx.commit().await?;

        Ok(docs.len())
    }

    /// Replace all documents of `source` with `docs` in one transaction.
    pub async fn replace_source(&self, source: &str, docs: &[DocumentRecord]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let removed = delete_source(&mut tx, source).await?;
        for doc in docs {
            upsert(&mut tx, doc)
                .await
                .with_context(|| format!("Failed to index document: {}", doc.id))?;
        }
        tx.commit().await?;

        tracing::debug!(source = %source, removed, indexed = docs.len(), "source replaced");
        Ok(docs.len())
    }

    /// Ranked full-text search.
    ///
    /// Blank or punctuation-only queries return no results.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let Some(expression) = build_match_expression(query, options.fuzzy) else {
            return Ok(Vec::new());
        };

        let limit = options.limit.unwrap_or(self.default_limit).max(0);
        let highlight = options.highlight.unwrap_or(false);

        let highlight_columns = if highlight {
            format!(
                "highlight(documents_fts, 0, '{open}', '{close}') AS title_highlight, \
                 snippet(documents_fts, 2, '{open}', '{close}', '{ellipsis}', {tokens}) AS snippet",
                open = HIGHLIGHT_OPEN,
                close = HIGHLIGHT_CLOSE,
                ellipsis = SNIPPET_ELLIPSIS,
                tokens = SNIPPET_TOKENS,
            )
        } else {
            "NULL AS title_highlight, NULL AS snippet".to_string()
        };

        let source_filter = if options.sources.is_empty() {
            String::new()
        } else {
            let placeholders = vec!["?"; options.sources.len()].join(", ");
            format!("AND d.source IN ({})", placeholders)
        };

        let sql = format!(
            r#"
            SELECT d.id, d.source, d.path, d.title, d.metadata_json,
                   -bm25(documents_fts, {w_title}, {w_headings}, {w_content}) AS score,
                   {highlight_columns}
            FROM documents_fts
            JOIN documents d ON d.rowid = documents_fts.rowid
            WHERE documents_fts MATCH ?
            {source_filter}
            ORDER BY score DESC, d.id ASC
            LIMIT ?
            "#,
            w_title = BM25_WEIGHTS.0,
            w_headings = BM25_WEIGHTS.1,
            w_content = BM25_WEIGHTS.2,
        );

        let mut q = sqlx::query(&sql).bind(&expression);
        for source in &options.sources {
            q = q.bind(source);
        }
        let rows = q.bind(limit).fetch_all(&self.pool).await?;

        rows.iter().map(|row| self.row_to_result(row)).collect()
    }

    fn row_to_result(&self, row: &SqliteRow) -> Result<SearchResult> {
        let source: String = row.get("source");
        let path: String = row.get("path");
        let metadata_json: String = row.get("metadata_json");

        let absolute_path = self.base_path.join(&source).join(&path);

        Ok(SearchResult {
            id: row.get("id"),
            title: row.get("title"),
            title_highlight: row.try_get("title_highlight")?,
            snippet: row.try_get("snippet")?,
            score: row.get("score"),
            metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
            absolute_path: absolute_path.to_string_lossy().into_owned(),
            source,
            path,
        })
    }

    /// Full stored record, or `None` if the id is unknown.
    pub async fn get_document_by_id(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let row = sqlx::query(
            "SELECT id, source, path, relative_path, title, headings_json, content, metadata_json FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let headings_json: String = row.get("headings_json");
        let metadata_json: String = row.get("metadata_json");

        Ok(Some(DocumentRecord {
            id: row.get("id"),
            source: row.get("source"),
            path: row.get("path"),
            relative_path: row.get("relative_path"),
            title: row.get("title"),
            headings: serde_json::from_str(&headings_json).unwrap_or_default(),
            content: row.get("content"),
            metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
        }))
    }

    pub async fn document_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Document counts keyed by source. Sources without documents are absent.
    pub async fn document_count_by_source(&self) -> Result<BTreeMap<String, i64>> {
        let rows = sqlx::query("SELECT source, COUNT(*) AS doc_count FROM documents GROUP BY source")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("source"), row.get("doc_count")))
            .collect())
    }

    /// Remove one document. Returns whether it existed.
    pub async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM documents_fts WHERE rowid IN (SELECT rowid FROM documents WHERE id = ?)")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove every document.
    pub async fn clear(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM documents_fts")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM documents")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Remove every document of `source`. Returns how many were removed.
    pub async fn clear_source(&self, source: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let removed = delete_source(&mut tx, source).await?;
        tx.commit().await?;
        Ok(removed)
    }

    /// Merge FTS5 b-tree segments and let SQLite refresh its planner stats.
    pub async fn optimize(&self) -> Result<()> {
        sqlx::query("INSERT INTO documents_fts(documents_fts) VALUES('optimize')")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA optimize").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the index and delete its files.
    ///
    /// Returns `false` when there was nothing left to remove.
    pub async fn destroy(&self) -> Result<bool> {
        if !self.db_path.exists() {
            tracing::debug!(path = %self.db_path.display(), "nothing to destroy");
            return Ok(false);
        }

        self.pool.close().await;

        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.db_path.clone().into_os_string();
            file.push(suffix);
            let file = PathBuf::from(file);
            match std::fs::remove_file(&file) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to remove index file: {}", file.display()))
                }
            }
        }

        tracing::info!(path = %self.db_path.display(), "search index destroyed");
        Ok(true)
    }
}

async fn upsert(tx: &mut Transaction<'_, Sqlite>, doc: &DocumentRecord) -> Result<()> {
    let headings_json = serde_json::to_string(&doc.headings)?;
    let metadata_json = serde_json::to_string(&doc.metadata)?;
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO documents (id, source, path, relative_path, title, headings_json,
                               content, metadata_json, indexed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            source = excluded.source,
            path = excluded.path,
            relative_path = excluded.relative_path,
            title = excluded.title,
            headings_json = excluded.headings_json,
            content = excluded.content,
            metadata_json = excluded.metadata_json,
            indexed_at = excluded.indexed_at
        "#,
    )
    .bind(&doc.id)
    .bind(&doc.source)
    .bind(&doc.path)
    .bind(&doc.relative_path)
    .bind(&doc.title)
    .bind(&headings_json)
    .bind(&doc.content)
    .bind(&metadata_json)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    let rowid: i64 = sqlx::query_scalar("SELECT rowid FROM documents WHERE id = ?")
        .bind(&doc.id)
        .fetch_one(&mut **tx)
        .await?;

    sqlx::query("DELETE FROM documents_fts WHERE rowid = ?")
        .bind(rowid)
        .execute(&mut **tx)
        .await?;

    sqlx::query("INSERT INTO documents_fts (rowid, title, headings, content) VALUES (?, ?, ?, ?)")
        .bind(rowid)
        .bind(&doc.title)
        .bind(doc.headings.join("\n"))
        .bind(&doc.content)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

async fn delete_source(tx: &mut Transaction<'_, Sqlite>, source: &str) -> Result<u64> {
    sqlx::query("DELETE FROM documents_fts WHERE rowid IN (SELECT rowid FROM documents WHERE source = ?)")
        .bind(source)
        .execute(&mut **tx)
        .await?;
    let result = sqlx::query("DELETE FROM documents WHERE source = ?")
        .bind(source)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(source: &str, rel: &str, title: &str, content: &str) -> DocumentRecord {
        DocumentRecord {
            id: format!("{}::{}", source, rel),
            source: source.to_string(),
            path: rel.to_string(),
            relative_path: rel.to_string(),
            title: title.to_string(),
            headings: vec![title.to_string()],
            content: content.to_string(),
            metadata: BTreeMap::new(),
        }
    }

    async fn engine(tmp: &TempDir) -> SearchEngine {
        SearchEngine::open(&tmp.path().join("index.sqlite"), tmp.path().join("repos"), 20)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upsert_keeps_rowid_mapping() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;

        engine
            .index_document(&doc("s", "a.md", "Alpha", "first body"))
            .await
            .unwrap();
        engine
            .index_document(&doc("s", "a.md", "Alpha", "second body"))
            .await
            .unwrap();

        let fts_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents_fts")
            .fetch_one(&engine.pool)
            .await
            .unwrap();
        assert_eq!(fts_rows, 1);
        assert!(engine
            .search("first", &SearchOptions::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_absolute_path_uses_base_path() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        engine
            .index_document(&doc("cake", "orm/intro.md", "ORM", "tables and entities"))
            .await
            .unwrap();

        let results = engine
            .search("entities", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        let expected = tmp.path().join("repos").join("cake").join("orm/intro.md");
        assert_eq!(results[0].absolute_path, expected.to_string_lossy());
        assert!(results[0].snippet.is_none());
        assert!(results[0].title_highlight.is_none());
    }

    #[tokio::test]
    async fn test_highlight_marks_matches() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        engine
            .index_document(&doc("s", "a.md", "Routing Guide", "Routing maps URLs to controllers."))
            .await
            .unwrap();

        let results = engine
            .search(
                "routing",
                &SearchOptions {
                    highlight: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            results[0].title_highlight.as_deref(),
            Some("<mark>Routing</mark> Guide")
        );
        assert!(results[0]
            .snippet
            .as_deref()
            .unwrap()
            .contains("<mark>Routing</mark>"));
    }

    #[tokio::test]
    async fn test_replace_source_is_exact() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        engine
            .index_batch(&[
                doc("s", "old.md", "Old", "stale"),
                doc("t", "keep.md", "Keep", "other source"),
            ])
            .await
            .unwrap();

        engine
            .replace_source("s", &[doc("s", "new.md", "New", "fresh")])
            .await
            .unwrap();

        assert!(engine.get_document_by_id("s::old.md").await.unwrap().is_none());
        assert!(engine.get_document_by_id("s::new.md").await.unwrap().is_some());
        assert_eq!(engine.document_count().await.unwrap(), 2);
    }

    async fn reject_id(engine: &SearchEngine, id: &str) {
        sqlx::query(&format!(
            "CREATE TRIGGER reject_doc BEFORE INSERT ON documents WHEN NEW.id = '{}' \
             BEGIN SELECT RAISE(ABORT, 'boom'); END",
            id
        ))
        .execute(&engine.pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_index_unchanged() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        engine
            .index_document(&doc("s", "existing.md", "Existing", "kept"))
            .await
            .unwrap();
        reject_id(&engine, "s::x.md").await;

        let err = engine
            .index_batch(&[doc("s", "ok.md", "Ok", "fine"), doc("s", "x.md", "X", "bad")])
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("boom"));
        assert_eq!(engine.document_count().await.unwrap(), 1);
        assert!(engine.get_document_by_id("s::ok.md").await.unwrap().is_none());
        assert!(engine
            .search("fine", &SearchOptions::default())
            .await
            .unwrap()
            .is_empty());

        // the connection is usable again, so no transaction was left open
        engine
            .index_document(&doc("s", "after.md", "After", "later"))
            .await
            .unwrap();
        assert_eq!(engine.document_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_previous_documents() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        engine
            .index_batch(&[doc("s", "old.md", "Old", "previous"), doc("t", "t.md", "T", "other")])
            .await
            .unwrap();
        reject_id(&engine, "s::x.md").await;

        let result = engine
            .replace_source("s", &[doc("s", "new.md", "New", "fresh"), doc("s", "x.md", "X", "bad")])
            .await;
        assert!(result.is_err());
        assert_eq!(engine.document_count().await.unwrap(), 2);
        assert!(engine.get_document_by_id("s::old.md").await.unwrap().is_some());
        assert!(engine.get_document_by_id("s::new.md").await.unwrap().is_none());
        assert_eq!(
            engine
                .search("previous", &SearchOptions::default())
                .await
                .unwrap()
                .len(),
            1
        );

        engine
            .index_document(&doc("s", "after.md", "After", "later"))
            .await
            .unwrap();
        assert_eq!(engine.document_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_search_blank_query_is_empty() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        engine
            .index_document(&doc("s", "a.md", "A", "anything"))
            .await
            .unwrap();
        assert!(engine
            .search("  ", &SearchOptions::default())
            .await
            .unwrap()
            .is_empty());
    }
}
