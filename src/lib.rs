//! # docsearch
//!
//! Git-backed documentation ingestion and full-text search.
//!
//! Documentation sources are git repositories containing markdown. Each
//! source is cloned once into a local working copy, its markdown files are
//! reduced to plain searchable text, and the results are stored in a SQLite
//! FTS5 index that serves ranked, highlighted, optionally fuzzy queries.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌───────────────┐
//! │  Repository  │──▶│  processor  │──▶│ SearchEngine  │
//! │ Manager/git  │   │ md → record │   │ SQLite FTS5   │
//! └──────────────┘   └─────────────┘   └───────┬───────┘
//!                                              │
//!                        DocumentSearchService ┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration, source catalog, path resolution |
//! | [`error`] | Typed failure categories |
//! | [`git`] | Pluggable git transport |
//! | [`repository`] | One source's working copy |
//! | [`repository_manager`] | Source catalog and clone lifecycle |
//! | [`processor`] | Markdown to document record conversion |
//! | [`query`] | User query to FTS5 match expression |
//! | [`search`] | Persistent full-text index |
//! | [`service`] | Indexing and search orchestration |
//! | [`sources`] | Per-source status report |
//! | [`stats`] | Statistics output |
//! | [`get`] | Single document output |
//! | [`db`] | SQLite connection |
//! | [`migrate`] | Index schema |

pub mod config;
pub mod db;
pub mod error;
pub mod get;
pub mod git;
pub mod migrate;
pub mod models;
pub mod processor;
pub mod query;
pub mod repository;
pub mod repository_manager;
pub mod search;
pub mod service;
pub mod sources;
pub mod stats;

pub use error::DocsError;
pub use git::{CommandGitAdapter, GitAdapter};
pub use models::{DocumentRecord, SearchOptions, SearchResult, Statistics};
pub use repository::Repository;
pub use repository_manager::RepositoryManager;
pub use search::SearchEngine;
pub use service::DocumentSearchService;
