//! HTML parser for extracting content, links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Page title and description (`<meta name="description">` or `og:description`)
//! - The main content text, preferring `main`/`article` style containers
//! - Links to follow (from <a> tags and canonical links)

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Containers that usually hold the documentation body, in priority order
const MAIN_CONTENT_SELECTOR: &str = "main, article, [role='main'], .content, #content";

/// Markers left by client-side rendered apps
const SPA_SELECTOR: &str =
    "#root, #app, [data-react-root], [data-reactroot], [id^='__nuxt'], [id^='__next'], [ng-app], [data-ng-app], app-root";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| selector("meta[name='description'][content]"));
static OG_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| selector("meta[property='og:description'][content]"));
static MAIN_CONTENT: Lazy<Selector> = Lazy::new(|| selector(MAIN_CONTENT_SELECTOR));
static BODY: Lazy<Selector> = Lazy::new(|| selector("body"));
static SPA_MARKERS: Lazy<Selector> = Lazy::new(|| selector(SPA_SELECTOR));
static ANCHORS: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static CANONICAL: Lazy<Selector> = Lazy::new(|| selector("link[rel='canonical'][href]"));

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Meta description, falling back to the Open Graph description
    pub description: Option<String>,

    /// Visible text of the main content area (or the whole body)
    pub text: String,

    /// All links found on the page (absolute URLs)
    pub links: Vec<Url>,

    /// Whether the page looks like a client-side rendered app shell
    pub spa_detected: bool,
}

/// Parses HTML content and extracts text, links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and same-page fragments
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
///
/// # Example
///
/// ```
/// use crawldocs::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        description: extract_description(&document),
        text: extract_text(&document),
        links: extract_links(&document, base_url),
        spa_detected: document.select(&SPA_MARKERS).next().is_some(),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    document
        .select(&TITLE)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_description(document: &Html) -> Option<String> {
    let content = |selector: &Selector| {
        document
            .select(selector)
            .filter_map(|element| element.value().attr("content"))
            .map(|s| s.trim().to_string())
            .find(|s| !s.is_empty())
    };

    content(&META_DESCRIPTION).or_else(|| content(&OG_DESCRIPTION))
}

/// Text of the first main content container, or of the body
fn extract_text(document: &Html) -> String {
    document
        .select(&MAIN_CONTENT)
        .next()
        .or_else(|| document.select(&BODY).next())
        .map(visible_text)
        .unwrap_or_default()
}

/// Concatenates text nodes, leaving out scripts and styles
fn visible_text(element: ElementRef<'_>) -> String {
    let mut pieces = Vec::new();

    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |e| matches!(e.name(), "script" | "style" | "noscript" | "template"))
        });
        let text = text.trim();
        if !hidden && !text.is_empty() {
            pieces.push(text);
        }
    }

    pieces.join(" ")
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    for element in document.select(&ANCHORS) {
        // Skip if it has the download attribute
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(href) = element.value().attr("href") {
            if let Some(absolute_url) = resolve_link(href, base_url) {
                links.push(absolute_url);
            }
        }
    }

    for element in document.select(&CANONICAL) {
        if let Some(href) = element.value().attr("href") {
            if let Some(absolute_url) = resolve_link(href, base_url) {
                links.push(absolute_url);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    // Skip empty hrefs
    if href.is_empty() {
        return None;
    }

    // Skip special schemes
    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    // Skip fragment-only links (same page anchors)
    if href.starts_with('#') {
        return None;
    }

    // Try to resolve the URL
    match base_url.join(href) {
        Ok(mut absolute_url) => {
            // Only accept HTTP and HTTPS URLs
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                absolute_url.set_fragment(None);
                Some(absolute_url)
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
