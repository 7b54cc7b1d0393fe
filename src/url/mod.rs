//! URL handling module for CrawlDocs
//!
//! This module provides URL canonicalization, domain extraction and the
//! single-domain scoping rule.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, is_in_scope};
pub use normalize::normalize_url;
