//! Page document rendering

use url::Url;

/// Renders a cleaned page as the markdown document written to disk
pub fn format_page_document(title: &str, url: &str, cleaned: &str) -> String {
    format!("# {}\n\nSource: {}\n\n---\n\n{}", title, url, cleaned)
}

/// Output directory used when none is configured: the host with dots replaced
///
/// `https://docs.example.com/` becomes `docs_example_com`.
pub fn default_output_dir(url: &Url) -> String {
    match url.host_str() {
        Some(host) if !host.is_empty() => host.replace('.', "_"),
        _ => "output".to_string(),
    }
}
