//! Crawler module for web page fetching and processing
//!
//! This module contains the crawl engine and its boundary with the
//! persistence core:
//! - HTTP fetching with redirect following
//! - HTML parsing, text and link extraction
//! - Request scheduling and rate limiting
//! - The per-session page handler ([`CrawlSession`])

mod coordinator;
mod events;
mod fetcher;
mod parser;
mod scheduler;
mod session;

pub use coordinator::{run, CrawlOutcome};
pub use events::{LinkEvent, PageEvent};
pub use fetcher::{build_http_client, fetch_url, is_html_content_type, FetchResult, MAX_REDIRECTS};
pub use parser::{parse_html, ParsedPage};
pub use scheduler::{RateLimiter, Scheduler};
pub use session::{CrawlSession, PageOutcome};

use crate::output::SessionReport;
use std::sync::Arc;

/// Runs a session to the end
///
/// This is the main entry point for crawling. It will:
/// 1. Build the HTTP client
/// 2. Seed the frontier from the session's pending queue
/// 3. Fetch pages and follow in-scope links until done or stopped
/// 4. Drain the persistence pipeline and save the final manifest
///
/// # Arguments
///
/// * `session` - A started or resumed session
///
/// # Returns
///
/// * `Ok(SessionReport)` - Report over the saved session
/// * `Err(CrawlDocsError)` - The client could not be built or the final save failed
pub async fn crawl(session: Arc<CrawlSession>) -> crate::Result<SessionReport> {
    let client = build_http_client(session.crawler_config())?;
    let seeds = session.seeds();
    let outcome = run(Arc::clone(&session), client, seeds).await;
    session.finish(outcome).await
}
