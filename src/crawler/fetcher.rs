//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - GET requests with redirect following (max 10 hops)
//! - Error classification
//!
//! Non-2xx responses are not errors here: they are handed back with their
//! status code so the session can record them as page outcomes.

use crate::config::CrawlerConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Longest redirect chain followed before giving up
pub const MAX_REDIRECTS: usize = 10;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched an HTML page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value
        content_type: String,
        /// Page body content
        body: String,
    },

    /// Page is not HTML (Content-Type mismatch)
    ContentMismatch {
        status_code: u16,
        /// The actual Content-Type received
        content_type: String,
    },

    /// Server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
        content_type: Option<String>,
    },

    /// Network error (connection refused, timeout, too many redirects, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration (user agent and timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use crawldocs::config::CrawlerConfig;
/// use crawldocs::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(config.timeout_seconds.max(1));

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true for content types the crawler extracts text from
pub fn is_html_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}

/// Fetches a URL and classifies the response
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with HTML content type | `Success` |
/// | 2xx with any other content type | `ContentMismatch` |
/// | Non-2xx status | `HttpError` |
/// | Timeout, connection failure, redirect chain > 10 | `NetworkError` |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(e),
    };

    let status = response.status();
    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
            content_type,
        };
    }

    let content_type = content_type.unwrap_or_default();
    if !is_html_content_type(&content_type) {
        return FetchResult::ContentMismatch {
            status_code: status.as_u16(),
            content_type,
        };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body,
        },
        Err(e) => classify_error(e),
    }
}

fn classify_error(e: reqwest::Error) -> FetchResult {
    let error = if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        "connection failed".to_string()
    } else if e.is_redirect() {
        format!("too many redirects (max {})", MAX_REDIRECTS)
    } else {
        e.to_string()
    };
    FetchResult::NetworkError { error }
}
