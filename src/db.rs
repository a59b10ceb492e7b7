//! SQLite connection management.
//!
//! Each search engine owns a pool capped at a single connection, so every
//! read and write against the index file is serialized. WAL journaling is
//! enabled; the database file and its parent directories are created on
//! first use.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::error::DocsError;

/// Open (creating if needed) the index database at `db_path`.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created, the database
/// cannot be opened, or the SQLite build lacks FTS5.
pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create index directory: {}", parent.display())
            })?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open index: {}", db_path.display()))?;

    if let Err(e) = ensure_fts5(&pool).await {
        pool.close().await;
        return Err(e);
    }

    Ok(pool)
}

/// Probe for the FTS5 module by creating and dropping a throwaway table.
async fn ensure_fts5(pool: &SqlitePool) -> Result<()> {
    let probe = sqlx::query("CREATE VIRTUAL TABLE IF NOT EXISTS temp.fts5_probe USING fts5(body)")
        .execute(pool)
        .await;

    if let Err(e) = probe {
        return Err(DocsError::FullTextUnsupported(e.to_string()).into());
    }

    sqlx::query("DROP TABLE IF EXISTS temp.fts5_probe")
        .execute(pool)
        .await?;
    Ok(())
}
