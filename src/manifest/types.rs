//! Serializable session record types
//!
//! These types are the on-disk manifest format. Field names are the JSON
//! keys, so renaming a field is a format change.

use crate::config::CrawlerConfig;
use crate::manifest::Statistics;
use crate::state::{PageStatus, SessionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current manifest format version
pub const MANIFEST_VERSION: &str = "1.1.0";

/// Generates a session identifier from the current time
pub fn new_session_id() -> String {
    format!("crawl-{}", Utc::now().timestamp())
}

/// Identity and lifecycle of one crawl session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub base_url: String,
    pub domain: String,
    pub output_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
}

/// Crawler settings the session was started with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub max_pages: u32,
    pub parallelism: u32,
    pub rate_limit: u32,
    pub timeout_seconds: u64,
    pub user_agent: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

fn default_max_depth() -> u32 {
    CrawlerConfig::default().max_depth
}

impl From<&CrawlerConfig> for ConfigSnapshot {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            parallelism: config.parallelism,
            rate_limit: config.rate_limit,
            timeout_seconds: config.timeout_seconds,
            user_agent: config.user_agent.clone(),
            max_depth: config.max_depth,
        }
    }
}

impl ConfigSnapshot {
    /// Rebuilds a crawler configuration from the snapshot
    pub fn to_crawler_config(&self) -> CrawlerConfig {
        CrawlerConfig {
            max_pages: self.max_pages,
            parallelism: self.parallelism,
            rate_limit: self.rate_limit,
            timeout_seconds: self.timeout_seconds,
            max_depth: self.max_depth,
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Outcome of one observed URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content_hash: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub file_name: String,
    pub crawled_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links_found: Vec<String>,
    #[serde(default)]
    pub extracted_links: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_url: Option<String>,
    #[serde(default)]
    pub depth: u32,
    pub status: PageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl PageRecord {
    /// Creates a bare record with the given outcome, stamped with the current time
    pub fn new(url: impl Into<String>, status: PageStatus) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            content_hash: String::new(),
            file_size: 0,
            file_name: String::new(),
            crawled_at: Utc::now(),
            last_modified: None,
            response_code: None,
            content_type: None,
            processing_time_ms: 0,
            links_found: Vec::new(),
            extracted_links: 0,
            parent_url: None,
            depth: 0,
            status,
            error_message: None,
            duplicate: false,
            duplicate_of: None,
            metadata: BTreeMap::new(),
        }
    }

    /// A page whose document was (or is about to be) written
    pub fn completed(
        url: impl Into<String>,
        title: impl Into<String>,
        content_hash: impl Into<String>,
        file_name: impl Into<String>,
        file_size: u64,
    ) -> Self {
        Self {
            title: title.into(),
            content_hash: content_hash.into(),
            file_name: file_name.into(),
            file_size,
            ..Self::new(url, PageStatus::Completed)
        }
    }

    /// A page that could not be fetched or written
    pub fn failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            error_message: Some(reason.into()),
            ..Self::new(url, PageStatus::Failed)
        }
    }

    /// A page that was fetched but rejected
    pub fn skipped(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            error_message: Some(reason.into()),
            ..Self::new(url, PageStatus::Skipped)
        }
    }

    /// A page rejected because its content matches an earlier page
    ///
    /// `original` is `None` when the earlier page could not be identified.
    pub fn duplicate(url: impl Into<String>, content_hash: impl Into<String>, original: Option<String>) -> Self {
        let reason = match &original {
            Some(original) => format!("duplicate of {}", original),
            None => "duplicate content (original unknown)".to_string(),
        };
        Self {
            content_hash: content_hash.into(),
            duplicate: true,
            duplicate_of: original,
            ..Self::skipped(url, reason)
        }
    }

    pub fn with_response(mut self, status_code: u16, content_type: Option<String>) -> Self {
        self.response_code = Some(status_code);
        self.content_type = content_type;
        self
    }

    pub fn with_lineage(mut self, parent_url: Option<String>, depth: u32) -> Self {
        self.parent_url = parent_url;
        self.depth = depth;
        self
    }

    pub fn with_processing_time(mut self, millis: u64) -> Self {
        self.processing_time_ms = millis;
        self
    }

    pub fn with_links(mut self, links: Vec<String>) -> Self {
        self.extracted_links = links.len();
        self.links_found = links;
        self
    }

    /// Returns true if this record was skipped as duplicate content
    pub fn is_duplicate(&self) -> bool {
        self.status == PageStatus::Skipped && self.duplicate
    }
}

/// A discovered URL that has no outcome yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRecord {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_url: Option<String>,
    pub depth: u32,
    #[serde(default)]
    pub priority: u32,
    pub added_at: DateTime<Utc>,
}

impl QueueRecord {
    pub fn new(url: impl Into<String>, parent_url: Option<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            parent_url,
            depth,
            priority: depth,
            added_at: Utc::now(),
        }
    }
}

/// The complete durable session document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub metadata: SessionMetadata,
    #[serde(default)]
    pub pages: BTreeMap<String, PageRecord>,
    #[serde(default)]
    pub queue: Vec<QueueRecord>,
    #[serde(default)]
    pub statistics: Statistics,
    pub config: ConfigSnapshot,
}

impl Manifest {
    /// Starts a new running session
    pub fn new(
        base_url: impl Into<String>,
        domain: impl Into<String>,
        output_dir: impl Into<String>,
        config: ConfigSnapshot,
    ) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            metadata: SessionMetadata {
                session_id: new_session_id(),
                start_time: Utc::now(),
                end_time: None,
                status: SessionStatus::Running,
                base_url: base_url.into(),
                domain: domain.into(),
                output_dir: output_dir.into(),
                config_hash: None,
            },
            pages: BTreeMap::new(),
            queue: Vec::new(),
            statistics: Statistics::default(),
            config,
        }
    }

    pub fn with_config_hash(mut self, hash: Option<String>) -> Self {
        self.metadata.config_hash = hash;
        self
    }
}
