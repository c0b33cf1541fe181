//! Extracted pages, the assembled document and session counters.

use serde::{Deserialize, Serialize};

/// Text captured from one location.
///
/// Holds only owned strings and counts, so it can cross any channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedPage {
    /// Location the content was read from
    pub url: String,
    /// Document title at extraction time
    pub title: String,
    /// Normalized text
    pub content: String,
    /// Whitespace-separated words in `content`
    pub word_count: usize,
    /// Content regions that contributed text
    pub sections_count: usize,
    /// Label of the navigation item that led here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    /// Location of the navigation item that led here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_url: Option<String>,
}

impl ExtractedPage {
    /// Attach the navigation item this page was reached through.
    #[must_use]
    pub fn with_section(mut self, title: impl Into<String>, url: impl Into<String>) -> Self {
        self.section_title = Some(title.into());
        self.section_url = Some(url.into());
        self
    }

    /// Length of the trimmed content in characters.
    #[must_use]
    pub fn char_count(&self) -> usize {
        self.content.trim().chars().count()
    }

    /// Heading used when the page is stitched into a document.
    #[must_use]
    pub fn heading(&self) -> &str {
        self.section_title.as_deref().unwrap_or("Section")
    }
}

/// Final document delivered on the completion channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeDocument {
    /// Location the scrape started from
    pub url: String,
    /// Document title, prefixed when partial
    pub title: String,
    /// Concatenated section text
    pub content: String,
    /// Total words across all sections
    pub word_count: usize,
    /// Number of sections
    pub sections_count: usize,
}

/// Counters reported while a session runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeStats {
    /// Disclosure controls activated
    pub expanded_count: u32,
    /// Candidate pages found by discovery
    pub found_links: u32,
    /// Pages retained
    pub scraped_count: u32,
    /// Per-page failures over the whole session
    pub failed_count: u32,
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
    fn test_char_count_ignores_surrounding_whitespace() {
        assert_eq!(page("  héllo  ").char_count(), 5);
    }

    #[test]
    fn test_heading_falls_back_to_section() {
        let p = page("x");
        assert_eq!(p.heading(), "Section");
        let p = p.with_section("Get Invoice", "https://docs.example.com/reference/get-invoice");
        assert_eq!(p.heading(), "Get Invoice");
    }

    #[test]
    fn test_page_wire_format_is_camel_case() {
        let json = serde_json::to_string(&page("x")).expect("serialize page");
        assert!(json.contains("wordCount"));
        assert!(!json.contains("sectionTitle"));
    }
}
