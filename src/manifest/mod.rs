//! Crawl manifest: the durable record of a session
//!
//! This module handles:
//! - The serializable session document (metadata, pages, queue, statistics, config)
//! - Statistics derived from the page records
//! - The thread-safe store that owns the session while crawling
//! - Atomic save and validated load of `crawl-manifest.json`

mod statistics;
mod store;
mod types;

pub use statistics::{ProcessingTimeStats, Statistics, DUPLICATE_REASON};
pub use store::{manifest_path, ManifestStore, Progress, MANIFEST_FILE, MANIFEST_TEMP_FILE};
pub use types::{
    new_session_id, ConfigSnapshot, Manifest, PageRecord, QueueRecord, SessionMetadata,
    MANIFEST_VERSION,
};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during manifest operations
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("No manifest found at {0}")]
    NotFound(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt manifest at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to serialize manifest: {0}")]
    Serialize(serde_json::Error),

    #[error("Session {0} is already completed")]
    SessionClosed(String),
}

/// Result type for manifest operations
pub type ManifestResult<T> = Result<T, ManifestError>;
