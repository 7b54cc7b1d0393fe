use serde::{Deserialize, Serialize};

/// Main configuration structure for CrawlDocs
///
/// Every section has defaults, so an empty file (or no file at all) yields
/// a usable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of pages to process (0 = unlimited)
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Maximum number of concurrent page fetches
    pub parallelism: u32,

    /// Requests per second against the target site (0 = unlimited)
    #[serde(rename = "rate-limit")]
    pub rate_limit: u32,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-seconds")]
    pub timeout_seconds: u64,

    /// Maximum link depth from the start URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// User agent sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 5000,
            parallelism: 10,
            rate_limit: 10,
            timeout_seconds: 30,
            max_depth: 10,
            user_agent: "CrawlDocs/2.0".to_string(),
        }
    }
}

/// Duplicate detection tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Cleaned content shorter than this is skipped as "minimal content"
    #[serde(rename = "min-content-length")]
    pub min_content_length: usize,

    /// Content shorter than this is exempt from duplicate classification and
    /// is fingerprinted together with its URL path and title
    #[serde(rename = "short-content-threshold")]
    pub short_content_threshold: usize,

    /// Upper bound on distinct fingerprints the bloom filter is sized for
    #[serde(rename = "expected-items")]
    pub expected_items: usize,

    /// Target false-positive rate of the bloom filter
    #[serde(rename = "false-positive-rate")]
    pub false_positive_rate: f64,

    /// Maximum entries held by the exact-match cache
    #[serde(rename = "cache-capacity")]
    pub cache_capacity: usize,

    /// Lifetime of an exact-match cache entry in seconds
    #[serde(rename = "cache-ttl-seconds")]
    pub cache_ttl_seconds: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            min_content_length: 100,
            short_content_threshold: 500,
            expected_items: 1_000_000,
            false_positive_rate: 0.0001,
            cache_capacity: 100_000,
            cache_ttl_seconds: 600,
        }
    }
}

/// How page documents are named on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileNaming {
    /// Sanitized URL path, e.g. `docs-getting-started.md`
    #[default]
    Slug,
    /// Zero-padded ordinal, e.g. `0001.md`
    Sequential,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory (derived from the target host when absent)
    pub directory: Option<String>,

    /// File naming scheme for page documents
    #[serde(rename = "file-naming")]
    pub file_naming: FileNaming,

    /// Save the manifest after this many recorded pages
    #[serde(rename = "flush-interval")]
    pub flush_interval: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_naming: FileNaming::Slug,
            flush_interval: 10,
        }
    }
}
