//! Index schema.
//!
//! `documents` holds the stored projection of each record keyed by `id`;
//! `documents_fts` is an FTS5 table whose rowid mirrors `documents.rowid`.
//! Both are created idempotently.

use anyhow::Result;
use sqlx::SqlitePool;

/// Tokenizer used for title, heading and body text.
// No stemmer: prefix queries must see the same tokens exact queries do.
const FTS_TOKENIZER: &str = "unicode61 remove_diacritics 2";

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            path TEXT NOT NULL,
            relative_path TEXT NOT NULL,
            title TEXT NOT NULL,
            headings_json TEXT NOT NULL DEFAULT '[]',
            content TEXT NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            indexed_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='documents_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(&format!(
            "CREATE VIRTUAL TABLE documents_fts USING fts5(title, headings, content, tokenize = '{}')",
            FTS_TOKENIZER
        ))
        .execute(pool)
        .await?;
    }

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_source ON documents(source)")
        .execute(pool)
        .await?;

    Ok(())
}
