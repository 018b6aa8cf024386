//! # Indexly - Local semantic file indexing and search
//!
//! Indexly walks a folder, extracts the text a human would actually search
//! for, and stores it in a SQLite FTS5 index.
//!
//! Indexly provides:
//! - Tiered token classification (human text, structured values, noise)
//! - Incremental re-indexing keyed on BLAKE3 content hashes
//! - FTS5 query parsing with phrase, prefix, NEAR and fuzzy expansion
//! - A generation-aware search result cache and saved search profiles
//! - Tagging, renaming, folder organisation, backups, and CSV, JSON and XML analysis
//! - An NDJSON event log with batching, rotation and retention

pub mod analysis;
pub mod backup;
pub mod compare;
pub mod config;
pub mod eventlog;
pub mod extract;
pub mod ignore;
pub mod indexer;
pub mod organize;
pub mod output;
pub mod profiles;
pub mod rename;
pub mod search;
pub mod semantic;
pub mod storage;
pub mod tags;
pub mod ui;
pub mod watcher;

// Re-exports for convenient access
pub use config::IndexlyConfig;
pub use indexer::{IndexStats, Indexer};
pub use search::{SearchEngine, SearchRequest, SearchResult};
pub use semantic::{TierFilter, TieredText};
pub use storage::IndexStore;

/// Result type alias for Indexly operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Indexly operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Message sent from parallel indexer workers to the coordinator
#[derive(Debug)]
pub enum IndexMessage {
    Processed {
        path: String,
        hash: String,
        document: Option<extract::ExtractedDocument>,
        status: FileStatus,
    },
    Skipped(String, extract::SkipReason),
    Error(String, String),
}

/// Status of a file during indexing
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    New,
    Modified,
    Unchanged,
    Deleted,
}

impl FileStatus {
    /// Event name written to the NDJSON log
    pub fn event_name(&self) -> &'static str {
        match self {
            FileStatus::New => "INDEX_NEW",
            FileStatus::Modified => "INDEX_MODIFIED",
            FileStatus::Unchanged => "INDEX_UNCHANGED",
            FileStatus::Deleted => "INDEX_DELETED",
        }
    }
}
