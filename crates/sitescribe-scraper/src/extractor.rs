//! Content extraction from the displayed page.
//!
//! Main-content regions are located with an ordered selector list, filtered
//! against page chrome, and rendered from serializable snapshots into
//! markdown-flavored plain text.

use crate::error::Result;
use crate::text::{normalize_text, word_count};
use sitescribe_browser::{DomElement, DomNode, ElementHandle, FrameContent, PageEnvironment};
use sitescribe_core::{ExtractedPage, LimitsConfig, ScrapeOptions};

/// Candidate main-content regions, most specific first.
pub const CONTENT_SELECTORS: [&str; 14] = [
    "main",
    "[role=\"main\"]",
    ".main-content",
    ".content",
    ".post-content",
    ".entry-content",
    ".article-content",
    "article",
    ".documentation",
    ".docs",
    "#content",
    "#main",
    ".container",
    ".wrapper",
];

/// Substrings of a tag, class or id that mark page chrome.
const CHROME_KEYWORDS: [&str; 8] = [
    "nav",
    "header",
    "footer",
    "sidebar",
    "menu",
    "advertisement",
    "banner",
    "popup",
];

/// Chrome keyword that only counts as a whole class or id token.
const CHROME_TOKEN: &str = "ad";

/// Elements never rendered, along with their subtree.
const SKIPPED_TAGS: [&str; 6] = ["script", "style", "noscript", "iframe", "object", "embed"];

const BLOCK_TAGS: [&str; 4] = ["p", "div", "section", "article"];

const UNTITLED: &str = "Untitled Page";

/// Rendering switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Render absolute links as `[text](href)`
    pub include_links: bool,
}

impl From<&ScrapeOptions> for RenderOptions {
    fn from(options: &ScrapeOptions) -> Self {
        Self {
            include_links: options.include_links,
        }
    }
}

struct Renderer<'o> {
    options: &'o RenderOptions,
    out: String,
    last_tag: String,
}

impl Renderer<'_> {
    fn walk_children(&mut self, element: &DomElement) {
        for child in &element.children {
            self.walk(child);
        }
    }

    fn walk(&mut self, node: &DomNode) {
        match node {
            DomNode::Text { text } => {
                let text = text.trim();
                if !text.is_empty() {
                    self.out.push_str(text);
                    self.out.push(' ');
                }
            }
            DomNode::Element(element) => {
                if !element.visible || SKIPPED_TAGS.contains(&element.tag.as_str()) {
                    return;
                }
                let tag = element.tag.as_str();
                match tag {
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                        let level = usize::from(tag.as_bytes()[1] - b'0');
                        self.out.push_str("\n\n");
                        self.out.push_str(&"#".repeat(level));
                        self.out.push(' ');
                    }
                    _ if BLOCK_TAGS.contains(&tag) && self.last_tag != tag => {
                        self.out.push_str("\n\n");
                    }
                    "br" => self.out.push('\n'),
                    "li" => self.out.push_str("\n- "),
                    _ => {}
                }
                self.last_tag.clear();
                self.last_tag.push_str(tag);

                if tag == "a" && self.options.include_links {
                    if let Some(href) = element.attr("href").filter(|h| h.starts_with("http")) {
                        let text = DomNode::Element(element.clone()).text_content();
                        let text = text.trim();
                        if !text.is_empty() {
                            self.out.push_str(&format!("[{text}]({href}) "));
                            return;
                        }
                    }
                }
                self.walk_children(element);
            }
        }
    }
}

/// Render the descendants of `root` as normalized text.
///
/// The root itself contributes no formatting. Deterministic: rendering the
/// same snapshot twice gives the same text.
#[must_use]
pub fn render_subtree(root: &DomNode, options: &RenderOptions) -> String {
    let mut renderer = Renderer {
        options,
        out: String::new(),
        last_tag: String::new(),
    };
    match root {
        DomNode::Element(element) => renderer.walk_children(element),
        DomNode::Text { .. } => renderer.walk(root),
    }
    normalize_text(&renderer.out)
}

/// Whether a tag, class or id marks navigation, ads or other chrome.
#[must_use]
pub fn is_chrome(tag: &str, class_name: &str, id: &str) -> bool {
    let fields = [
        tag.to_lowercase(),
        class_name.to_lowercase(),
        id.to_lowercase(),
    ];
    fields.iter().any(|field| {
        CHROME_KEYWORDS.iter().any(|keyword| field.contains(keyword))
            || field
                .split(|c: char| !c.is_ascii_alphanumeric())
                .any(|token| token == CHROME_TOKEN)
    })
}

/// A located content region.
#[derive(Debug, Clone)]
struct Region {
    element: ElementHandle,
    text_chars: usize,
}

/// Reads the displayed page into an [`ExtractedPage`].
pub struct PageExtractor<'a> {
    env: &'a dyn PageEnvironment,
    render: RenderOptions,
    include_embedded: bool,
    min_content_chars: usize,
    min_region_chars: usize,
}

impl<'a> PageExtractor<'a> {
    /// Extractor configured by the session options and the content limits.
    pub fn new(env: &'a dyn PageEnvironment, options: &ScrapeOptions, limits: &LimitsConfig) -> Self {
        Self {
            env,
            render: RenderOptions::from(options),
            include_embedded: options.include_embedded,
            min_content_chars: limits.min_content_chars,
            min_region_chars: limits.min_region_chars,
        }
    }

    /// Extract the current page. Returns `Ok(None)` when the content is not
    /// longer than the configured minimum.
    pub async fn extract_page(&self) -> Result<Option<ExtractedPage>> {
        let url = self.env.location().await?;
        let title = self.title().await?;

        let mut parts = Vec::new();
        for region in self.content_regions().await? {
            let snapshot = self.env.snapshot(region).await?;
            let text = render_subtree(&snapshot, &self.render);
            if !text.is_empty() {
                parts.push(text);
            }
        }

        if self.include_embedded {
            let embedded = self.embedded_content().await?;
            if !embedded.trim().is_empty() {
                parts.push(format!("## Embedded Content\n\n{embedded}"));
            }
        }

        let sections_count = parts.len();
        let content = normalize_text(&parts.join("\n\n"));
        let char_count = content.chars().count();
        if char_count <= self.min_content_chars {
            tracing::debug!(
                "Content of {} too short ({} chars), skipping",
                url,
                char_count
            );
            return Ok(None);
        }

        tracing::debug!("Extracted {} chars from {}", char_count, url);
        Ok(Some(ExtractedPage {
            url,
            title,
            word_count: word_count(&content),
            content,
            sections_count,
            section_title: None,
            section_url: None,
        }))
    }

    /// `<title>`, then the first `h1`, then `og:title`.
    pub async fn title(&self) -> Result<String> {
        for selector in ["title", "h1"] {
            if let Some(element) = self.env.first(selector).await? {
                let text = self.env.text_of(element).await?;
                if !text.is_empty() {
                    return Ok(text);
                }
            }
        }

        if let Some(meta) = self.env.first("meta[property=\"og:title\"]").await? {
            let info = self.env.describe(meta).await?;
            if let Some(content) = info.attr("content").map(str::trim).filter(|c| !c.is_empty()) {
                return Ok(content.to_string());
            }
        }
        Ok(UNTITLED.to_string())
    }

    /// Main-content regions, chrome removed and nesting collapsed to the
    /// smaller region. Falls back to `body`.
    async fn content_regions(&self) -> Result<Vec<ElementHandle>> {
        let mut candidates = Vec::new();
        for selector in CONTENT_SELECTORS {
            for element in self.env.query_all(selector).await? {
                let info = self.env.describe(element).await?;
                let text_chars = info.text.chars().count();
                if text_chars < self.min_region_chars
                    || is_chrome(&info.tag, info.class_name(), info.id())
                {
                    continue;
                }
                candidates.push(Region {
                    element,
                    text_chars,
                });
            }
        }

        let mut regions: Vec<Region> = Vec::new();
        'candidates: for candidate in candidates {
            for existing in &mut regions {
                if existing.element == candidate.element
                    || self.env.contains(existing.element, candidate.element).await?
                    || self.env.contains(candidate.element, existing.element).await?
                {
                    if candidate.text_chars < existing.text_chars {
                        *existing = candidate;
                    }
                    continue 'candidates;
                }
            }
            regions.push(candidate);
        }

        if regions.is_empty() {
            tracing::debug!("No content region matched; using body");
            return Ok(self.env.first("body").await?.into_iter().collect());
        }
        Ok(regions.into_iter().map(|r| r.element).collect())
    }

    async fn embedded_content(&self) -> Result<String> {
        let mut embedded = String::new();
        for frame in self.env.frames().await? {
            match frame {
                FrameContent::Accessible { src, body } => {
                    let text = render_subtree(&body, &self.render);
                    if !text.is_empty() {
                        embedded.push_str(&format!(
                            "\n\n### Embedded Frame: {}\n\n{}",
                            src.as_deref().unwrap_or("Unknown"),
                            text
                        ));
                    }
                }
                FrameContent::Restricted { src } => {
                    embedded.push_str(&format!(
                        "\n\n### Embedded Frame (Restricted Access): {src}\n\n"
                    ));
                }
            }
        }
        Ok(embedded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn el(tag: &str, children: Vec<DomNode>) -> DomNode {
        DomNode::element(tag, children)
    }

    fn link(href: &str, text: &str) -> DomNode {
        let mut attrs = BTreeMap::new();
        attrs.insert("href".to_string(), href.to_string());
        DomNode::Element(DomElement {
            tag: "a".to_string(),
            attrs,
            visible: true,
            children: vec![DomNode::text(text)],
        })
    }

    #[test]
    fn test_render_headings_and_lists() {
        let root = el(
            "main",
            vec![
                el("h2", vec![DomNode::text("Invoices")]),
                el("p", vec![DomNode::text("  Create and list   invoices. ")]),
                el(
                    "ul",
                    vec![
                        el("li", vec![DomNode::text("Draft")]),
                        el("li", vec![DomNode::text("Posted")]),
                    ],
                ),
            ],
        );
        let text = render_subtree(&root, &RenderOptions::default());
        assert_eq!(text, "## Invoices\n\nCreate and list invoices.\n- Draft\n- Posted");
    }

    #[test]
    fn test_render_skips_scripts_and_hidden() {
        let hidden = DomNode::Element(DomElement {
            tag: "p".to_string(),
            attrs: BTreeMap::new(),
            visible: false,
            children: vec![DomNode::text("hidden")],
        });
        let root = el(
            "div",
            vec![
                el("script", vec![DomNode::text("var x = 1;")]),
                hidden,
                el("span", vec![DomNode::text("shown")]),
            ],
        );
        assert_eq!(render_subtree(&root, &RenderOptions::default()), "shown");
    }

    #[test]
    fn test_render_links() {
        let root = el(
            "p",
            vec![
                DomNode::text("See"),
                link("https://api.example.com/openapi.json", "the OpenAPI schema"),
                link("/relative", "relative"),
            ],
        );
        let with_links = RenderOptions {
            include_links: true,
        };
        assert_eq!(
            render_subtree(&root, &with_links),
            "See [the OpenAPI schema](https://api.example.com/openapi.json) relative"
        );
        assert_eq!(
            render_subtree(&root, &RenderOptions::default()),
            "See the OpenAPI schema relative"
        );
    }

    #[test]
    fn test_render_is_idempotent() {
        let root = el(
            "article",
            vec![
                el("h1", vec![DomNode::text("Usage")]),
                el("div", vec![DomNode::text("one")]),
                el("div", vec![DomNode::text("two")]),
                el("br", vec![]),
                el("section", vec![DomNode::text("three")]),
            ],
        );
        let options = RenderOptions::default();
        let first = render_subtree(&root, &options);
        assert_eq!(first, render_subtree(&root, &options));
        assert_eq!(first, "# Usage\n\none two\n\nthree");
    }

    #[test]
    fn test_chrome_detection() {
        assert!(is_chrome("nav", "", ""));
        assert!(is_chrome("div", "site-header", ""));
        assert!(is_chrome("div", "", "left-sidebar"));
        assert!(is_chrome("div", "promo ad", ""));
        assert!(is_chrome("div", "ad-slot", ""));
        assert!(!is_chrome("div", "read-more", ""));
        assert!(!is_chrome("div", "loaded", "download"));
        assert!(!is_chrome("main", "content", "content"));
    }
}
