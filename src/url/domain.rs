use url::Url;

/// Extracts the domain from a URL
///
/// # Returns
///
/// * `Some(String)` - The lowercase domain/host
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use crawldocs::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if the URL belongs to the crawl's scoping domain
///
/// Scoping is exact host equality: subdomains are separate sites.
pub fn is_in_scope(url: &Url, domain: &str) -> bool {
    extract_domain(url).is_some_and(|host| host.eq_ignore_ascii_case(domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_same_host_in_scope() {
        let url = Url::parse("https://docs.example.com/guide").unwrap();
        assert!(is_in_scope(&url, "docs.example.com"));
        assert!(is_in_scope(&url, "DOCS.example.com"));
    }

    #[test]
    fn test_subdomain_out_of_scope() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert!(!is_in_scope(&url, "example.com"));
    }

    #[test]
    fn test_other_host_out_of_scope() {
        let url = Url::parse("https://other.org/").unwrap();
        assert!(!is_in_scope(&url, "example.com"));
    }
}
