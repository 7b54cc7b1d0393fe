use crate::UrlError;
use url::Url;

/// Canonicalizes a URL for visited-set bookkeeping
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only HTTP and HTTPS
/// 3. Lowercase the host
/// 4. Empty path becomes /
/// 5. Remove fragment (everything after #)
///
/// Query strings and trailing slashes are left untouched: two URL variants
/// that serve identical content are caught by content fingerprinting, not
/// merged here.
///
/// # Examples
///
/// ```
/// use crawldocs::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM/guide/#install").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/guide/");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    if url.path().is_empty() {
        url.set_path("/");
    }

    url.set_fragment(None);

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keep_trailing_slash() {
        let result = normalize_url("https://example.com/page/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page/");
    }

    #[test]
    fn test_keep_query_string() {
        let result = normalize_url("https://example.com/page?b=2&a=1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?b=2&a=1");
    }

    #[test]
    fn test_keep_http_scheme() {
        let result = normalize_url("http://example.com/page").unwrap();
        assert_eq!(result.as_str(), "http://example.com/page");
    }

    #[test]
    fn test_lowercase_domain() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize_url("https://example.com").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_surrounding_whitespace() {
        let result = normalize_url("  https://example.com/docs  ").unwrap();
        assert_eq!(result.as_str(), "https://example.com/docs");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_malformed_url() {
        assert!(matches!(normalize_url("not a url"), Err(UrlError::Parse(_))));
    }
}
