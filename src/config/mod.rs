//! Configuration module for CrawlDocs
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; command line flags are layered on top by the binary.
//!
//! # Example
//!
//! ```no_run
//! use crawldocs::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawldocs.toml")).unwrap();
//! println!("Crawler will fetch at most {} pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, DedupConfig, FileNaming, OutputConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
