//! Stable identifiers.

use md5::{Digest, Md5};
use uuid::Uuid;

/// Stable document id for a URL: the lowercase hex MD5 of its bytes.
///
/// ```
/// use scrapeflow::utils::compute_id;
///
/// assert_eq!(compute_id("https://example.com"), compute_id("https://example.com"));
/// assert_eq!(compute_id("").len(), 32);
/// ```
#[must_use]
pub fn compute_id(url: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a time-ordered run id.
#[must_use]
pub fn new_run_id() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_id_known_value() {
        assert_eq!(compute_id(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_compute_id_distinguishes_urls() {
        assert_ne!(compute_id("https://a"), compute_id("https://b"));
    }

    #[test]
    fn test_run_ids_are_v7_and_ordered() {
        let first = new_run_id();
        let second = new_run_id();

        assert_eq!(first.get_version_num(), 7);
        assert_ne!(first, second);
        assert!(first <= second);
    }
}
