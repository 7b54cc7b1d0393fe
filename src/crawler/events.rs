//! Events delivered from the crawl engine to the session

use chrono::{DateTime, Utc};
use std::time::Duration;
use url::Url;

/// A fetched response, ready for classification
#[derive(Debug, Clone)]
pub struct PageEvent {
    /// URL that was requested (the session key, not the post-redirect URL)
    pub url: Url,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub title: Option<String>,
    /// Meta or Open Graph description, prepended to the text before cleaning
    pub description: Option<String>,
    /// Raw extracted text, before cleaning
    pub text: String,
    /// Outgoing links, already absolute
    pub links: Vec<Url>,
    pub parent_url: Option<String>,
    pub depth: u32,
    pub fetched_at: DateTime<Utc>,
    /// Time spent fetching and parsing before the event was raised
    pub elapsed: Duration,
}

impl PageEvent {
    pub fn new(url: Url, status_code: u16) -> Self {
        Self {
            url,
            status_code,
            content_type: None,
            title: None,
            description: None,
            text: String::new(),
            links: Vec::new(),
            parent_url: None,
            depth: 0,
            fetched_at: Utc::now(),
            elapsed: Duration::ZERO,
        }
    }

    /// A 200 `text/html` response carrying `title` and `text`
    pub fn html(url: Url, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(url, 200)
            .with_content_type("text/html; charset=utf-8")
            .with_title(title)
            .with_text(text)
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_links(mut self, links: Vec<Url>) -> Self {
        self.links = links;
        self
    }

    pub fn with_lineage(mut self, parent_url: Option<String>, depth: u32) -> Self {
        self.parent_url = parent_url;
        self.depth = depth;
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }
}

/// A discovered link, also the unit of work in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEvent {
    pub url: Url,
    pub parent_url: Option<String>,
    pub depth: u32,
}

impl LinkEvent {
    pub fn new(url: Url, parent_url: Option<String>, depth: u32) -> Self {
        Self {
            url,
            parent_url,
            depth,
        }
    }

    /// The crawl root
    pub fn seed(url: Url) -> Self {
        Self::new(url, None, 0)
    }
}
