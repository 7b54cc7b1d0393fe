//! Output module for page documents and session reports
//!
//! This module handles:
//! - Rendering a cleaned page as a markdown document
//! - Allocating collision-free document file names
//! - Building reports over a saved session (plain text and markdown)

mod document;
mod markdown;
mod naming;
mod report;

pub use document::{default_output_dir, format_page_document};
pub use markdown::{format_markdown_report, write_markdown_report};
pub use naming::{sequential_name, slugify, FileNamer};
pub use report::{format_text_report, generate_report, print_report, SessionReport};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load session: {0}")]
    Manifest(#[from] crate::manifest::ManifestError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
