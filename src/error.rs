//! Typed failure categories.
//!
//! Operations return `anyhow::Result`; the conditions callers need to tell
//! apart are raised as a [`DocsError`] so they can be recovered with
//! `err.downcast_ref::<DocsError>()`. Missing documents and missing files
//! are not errors and never appear here.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocsError {
    /// The source name is absent from the `[sources]` catalog.
    #[error("documentation source '{0}' is not configured")]
    SourceNotConfigured(String),

    /// The source exists but has `enabled = false`.
    #[error("documentation source '{0}' is disabled")]
    SourceDisabled(String),

    /// A required source field (`repository`, `branch`) is missing.
    #[error("documentation source '{source_name}' is missing required field '{field}'")]
    MissingField { source_name: String, field: String },

    /// Clone failure. Displays the git adapter's message unmodified.
    #[error("{message}")]
    CloneFailed { source_name: String, message: String },

    /// The SQLite build in use has no FTS5 module.
    #[error("SQLite full-text search (FTS5) is not available: {0}")]
    FullTextUnsupported(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DocsError {
    #[must_use]
    pub fn missing_field(source_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            source_name: source_name.into(),
            field: field.into(),
        }
    }
}
