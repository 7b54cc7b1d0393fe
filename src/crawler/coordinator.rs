//! Crawler coordinator - the fetch loop
//!
//! This module drives a session's crawl:
//! - Seeding the scheduler from the session's pending work
//! - Running up to `parallelism` fetches at once, spaced by the rate limiter
//! - Turning fetch results into page events for the session
//! - Feeding discovered links back through the session into the frontier
//!
//! The loop stops when the frontier is exhausted or the session asks it to
//! (page limit reached, or an interrupt). In-flight fetches always finish.

use crate::crawler::{fetch_url, parse_html, CrawlSession, FetchResult, LinkEvent, PageEvent, Scheduler};
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use url::Url;

/// Why the crawl loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// Every reachable in-scope URL was processed
    Exhausted,
    /// The page limit was reached
    LimitReached,
    /// Stopped on request before the frontier was exhausted
    Interrupted,
}

/// Runs the crawl loop until the frontier is exhausted or a stop is requested
///
/// # Arguments
///
/// * `session` - The session receiving page and link events
/// * `client` - HTTP client used for every fetch
/// * `seeds` - Initial frontier (see [`CrawlSession::seeds`])
pub async fn run(session: Arc<CrawlSession>, client: Client, seeds: Vec<LinkEvent>) -> CrawlOutcome {
    let mut scheduler = Scheduler::new(session.crawler_config());
    for seed in seeds {
        scheduler.enqueue(seed);
    }

    let parallelism = session.crawler_config().parallelism.max(1) as usize;
    let permits = Arc::new(Semaphore::new(parallelism));
    let mut tasks: JoinSet<Vec<LinkEvent>> = JoinSet::new();

    tracing::info!(
        "Crawling {} with {} workers ({} URLs queued)",
        session.base_url(),
        parallelism,
        scheduler.frontier_size()
    );

    loop {
        if session.is_stopped() {
            break;
        }

        if scheduler.is_empty() {
            // Nothing to start; wait for a running fetch to discover more
            match tasks.join_next().await {
                Some(result) => {
                    harvest(&session, &mut scheduler, result);
                    continue;
                }
                None => break,
            }
        }

        let permit = match Arc::clone(&permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                if let Some(result) = tasks.join_next().await {
                    harvest(&session, &mut scheduler, result);
                }
                continue;
            }
        };

        let Some(link) = scheduler.next() else {
            continue;
        };

        scheduler.wait_turn().await;

        let task_session = Arc::clone(&session);
        let task_client = client.clone();
        tasks.spawn(async move {
            let links = fetch_and_process(&task_session, &task_client, link).await;
            drop(permit);
            links
        });
    }

    if !tasks.is_empty() {
        tracing::info!("Waiting for {} in-flight fetches", tasks.len());
    }
    while let Some(result) = tasks.join_next().await {
        harvest(&session, &mut scheduler, result);
    }

    let outcome = if session.limit_reached() {
        CrawlOutcome::LimitReached
    } else if session.is_stopped() {
        CrawlOutcome::Interrupted
    } else {
        CrawlOutcome::Exhausted
    };

    tracing::info!(
        "Crawl loop finished ({:?}), {} URLs left in the frontier",
        outcome,
        scheduler.frontier_size()
    );
    outcome
}

/// Passes links from a finished fetch through the session into the frontier
fn harvest(session: &CrawlSession, scheduler: &mut Scheduler, result: Result<Vec<LinkEvent>, JoinError>) {
    match result {
        Ok(links) => {
            for link in links {
                if session.on_link_discovered(&link) {
                    scheduler.enqueue(link);
                }
            }
        }
        Err(e) => tracing::error!("Fetch task failed: {}", e),
    }
}

/// Fetches one URL and reports it to the session
///
/// # Returns
///
/// Links found on the page, one level deeper than `link`
async fn fetch_and_process(session: &CrawlSession, client: &Client, link: LinkEvent) -> Vec<LinkEvent> {
    let started = Instant::now();
    tracing::debug!("Fetching {} (depth {})", link.url, link.depth);

    let event = match fetch_url(client, link.url.as_str()).await {
        FetchResult::Success {
            final_url,
            status_code,
            content_type,
            body,
        } => {
            // Relative links resolve against where the redirects ended
            let base = Url::parse(&final_url).unwrap_or_else(|_| link.url.clone());
            let parsed = parse_html(&body, &base);
            if parsed.spa_detected {
                tracing::debug!(
                    "{} looks client-rendered; extracted text may be incomplete",
                    link.url
                );
            }

            let mut event = PageEvent::new(link.url.clone(), status_code)
                .with_content_type(content_type)
                .with_description(parsed.description)
                .with_text(parsed.text)
                .with_links(parsed.links);
            event.title = parsed.title;
            event
        }
        FetchResult::ContentMismatch {
            status_code,
            content_type,
        } => PageEvent::new(link.url.clone(), status_code).with_content_type(content_type),
        FetchResult::HttpError {
            status_code,
            content_type,
        } => {
            let mut event = PageEvent::new(link.url.clone(), status_code);
            event.content_type = content_type;
            event
        }
        FetchResult::NetworkError { error } => {
            tracing::warn!("Failed to fetch {}: {}", link.url, error);
            session.record_failure(&link, error);
            return Vec::new();
        }
    };

    let event = event
        .with_lineage(link.parent_url.clone(), link.depth)
        .with_elapsed(started.elapsed());
    let found = event.links.clone();

    let outcome = session.on_page(event).await;
    if !outcome.is_recorded() {
        return Vec::new();
    }

    let parent = link.url.to_string();
    found
        .into_iter()
        .map(|url| LinkEvent::new(url, Some(parent.clone()), link.depth + 1))
        .collect()
}
