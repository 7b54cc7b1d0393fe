//! CrawlDocs: a resumable documentation crawler
//!
//! This crate crawls a single website and persists every page as a cleaned
//! text document while rejecting duplicate and low-value content. All crawl
//! progress lives in a durable manifest so an interrupted session can pick up
//! exactly where it stopped.
//!
//! # Components
//!
//! - `fingerprint`: bloom filter + short-lived exact cache over content hashes
//! - `manifest`: the session record and its atomic on-disk representation
//! - `pipeline`: bounded write queue drained by a fixed worker pool
//! - `resume`: rebuilds in-memory state from a saved manifest
//! - `output`: page documents, file naming and session reports
//! - `crawler`: the fetch/parse engine and the per-page session handler

pub mod clean;
pub mod config;
pub mod crawler;
pub mod fingerprint;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod resume;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for CrawlDocs operations
#[derive(Debug, Error)]
pub enum CrawlDocsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] manifest::ManifestError),

    #[error("Fingerprint cache error: {0}")]
    Fingerprint(#[from] fingerprint::FingerprintError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] pipeline::PipelineError),

    #[error("Resume error: {0}")]
    Resume(#[from] resume::ResumeError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for CrawlDocs operations
pub type Result<T> = std::result::Result<T, CrawlDocsError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::CrawlSession;
pub use manifest::ManifestStore;
pub use state::{PageStatus, SessionStatus};
pub use url::{extract_domain, normalize_url};
