use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of arbitrary bytes
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Computes the duplicate-detection fingerprint of a cleaned page
///
/// Content shorter than `short_threshold` characters is hashed together
/// with its URL path and title, so near-empty pages that share the same
/// boilerplate still get distinct fingerprints. Longer content is hashed
/// as-is.
///
/// # Arguments
///
/// * `cleaned` - The cleaned page text
/// * `url_path` - Path component of the page URL
/// * `title` - Resolved page title
/// * `short_threshold` - Character count below which the canonical form is used
///
/// # Example
///
/// ```
/// use crawldocs::fingerprint::compute_fingerprint;
///
/// let a = compute_fingerprint("Welcome", "/a", "Home", 500);
/// let b = compute_fingerprint("Welcome", "/b", "Home", 500);
/// assert_ne!(a, b);
/// ```
pub fn compute_fingerprint(cleaned: &str, url_path: &str, title: &str, short_threshold: usize) -> String {
    if cleaned.chars().count() < short_threshold {
        let canonical = format!("URL:{}\nTITLE:{}\n{}", url_path, title, cleaned);
        content_hash(canonical.as_bytes())
    } else {
        content_hash(cleaned.as_bytes())
    }
}
