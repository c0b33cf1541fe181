//! Session-scoped duplicate detection.

use crate::discovery::NavigableItem;
use crate::text::collapse_whitespace;
use sha2::{Digest, Sha256};
use sitescribe_core::ExtractedPage;
use std::collections::HashSet;

/// Lowercased scheme and host, no trailing `/`; the fragment is kept so hash
/// routes stay distinct.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    let canonical = url::Url::parse(url.trim())
        .map(String::from)
        .unwrap_or_else(|_| url.trim().to_string());

    match canonical.split_once('#') {
        Some((base, fragment)) => format!("{}#{}", base.trim_end_matches('/'), fragment),
        None => canonical.trim_end_matches('/').to_string(),
    }
}

/// Trimmed and lowercased.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// SHA-256 over the first `chars` characters of the normalized content.
#[must_use]
pub fn content_fingerprint(content: &str, chars: usize) -> String {
    let normalized: String = collapse_whitespace(content)
        .to_lowercase()
        .chars()
        .take(chars)
        .collect();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Tracks visited locations, titles and content across one session.
#[derive(Debug, Default)]
pub struct Deduplicator {
    urls: HashSet<String>,
    titles: HashSet<String>,
    fingerprints: HashSet<String>,
    fingerprint_chars: usize,
}

impl Deduplicator {
    /// Fingerprints hash the first `fingerprint_chars` normalized characters.
    #[must_use]
    pub fn new(fingerprint_chars: usize) -> Self {
        Self {
            fingerprint_chars,
            ..Self::default()
        }
    }

    /// Whether the item's location or title was already visited.
    #[must_use]
    pub fn should_skip(&self, item: &NavigableItem) -> bool {
        self.urls.contains(&normalize_url(&item.url))
            || self.titles.contains(&normalize_title(&item.title))
    }

    /// Remember the item's location and title.
    pub fn mark_visited(&mut self, item: &NavigableItem) {
        self.urls.insert(normalize_url(&item.url));
        self.titles.insert(normalize_title(&item.title));
    }

    /// Record the page's fingerprint. Returns `false` if identical content was
    /// already admitted.
    pub fn admit(&mut self, page: &ExtractedPage) -> bool {
        self.fingerprints
            .insert(content_fingerprint(&page.content, self.fingerprint_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(content: &str) -> ExtractedPage {
        ExtractedPage {
            url: "https://docs.example.com/a".to_string(),
            title: "A".to_string(),
            content: content.to_string(),
            word_count: 0,
            sections_count: 1,
            section_title: None,
            section_url: None,
        }
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("HTTPS://Docs.Example.com/Guide/"),
            "https://docs.example.com/Guide"
        );
        assert_eq!(
            normalize_url("https://docs.example.com/docs/#auth"),
            "https://docs.example.com/docs#auth"
        );
        assert_ne!(
            normalize_url("https://docs.example.com/docs#a"),
            normalize_url("https://docs.example.com/docs#b")
        );
        assert_eq!(normalize_url("/relative/"), "/relative");
    }

    #[test]
    fn test_fingerprint_normalizes_prefix() {
        let a = content_fingerprint("Hello   World\nsame", 11);
        let b = content_fingerprint("hello world different tail", 11);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, content_fingerprint("hello there", 11));
    }

    #[test]
    fn test_should_skip_by_url_or_title() {
        let mut dedup = Deduplicator::new(500);
        let item = NavigableItem::new("Get Invoice", "https://docs.example.com/ref/inv/", "/ref/inv");
        assert!(!dedup.should_skip(&item));
        dedup.mark_visited(&item);

        let same_url = NavigableItem::new("Other", "https://docs.example.com/ref/inv", "/ref/inv");
        let same_title = NavigableItem::new(" get invoice ", "https://docs.example.com/x", "/x");
        assert!(dedup.should_skip(&same_url));
        assert!(dedup.should_skip(&same_title));
    }

    #[test]
    fn test_admit_rejects_identical_content() {
        let mut dedup = Deduplicator::new(500);
        assert!(dedup.admit(&page("Same body text")));
        assert!(!dedup.admit(&page("same   body text")));
        assert!(dedup.admit(&page("Different body")));
    }
}
