//! Link classification.
//!
//! Pure predicates over a link's visible text and raw `href`. Nothing here
//! touches the page; discovery gathers the inputs and decides what to do with
//! the verdicts.

use once_cell::sync::Lazy;
use regex::Regex;

/// Path fragments that mark documentation content.
const DOC_PATHS: [&str; 5] = ["/docs", "/api", "/reference", "/guide", "/tutorial"];

/// Boilerplate terms for the strategy-level filter.
const BOILERPLATE_TERMS: [&str; 19] = [
    "login", "logout", "sign in", "sign up", "register", "home", "back", "next", "previous",
    "search", "github", "twitter", "discord", "contact", "support", "privacy", "terms", "legal",
    "about",
];

/// Chrome and account terms rejected by the legacy pass.
const LEGACY_DENY_TERMS: [&str; 16] = [
    "home", "search", "login", "signup", "settings", "profile", "logout", "back", "next",
    "previous", "edit", "delete", "toggle", "menu", "close", "open",
];

/// Terms that make a legacy link worth keeping.
const ALLOW_TERMS: [&str; 15] = [
    "api", "endpoint", "reference", "guide", "tutorial", "get", "post", "put", "delete", "patch",
    "create", "update", "fetch", "list", "retrieve",
];

/// Terms rejected by the combined gate.
const PAGE_DENY_TERMS: [&str; 25] = [
    "home", "login", "sign up", "sign in", "logout", "register", "search", "menu", "toggle",
    "close", "open", "back", "next", "previous", "github", "twitter", "discord", "slack",
    "contact", "support", "privacy", "terms", "legal", "about", "company",
];

/// Section landing titles that never name an endpoint.
const GENERIC_ENDPOINT_TITLES: [&str; 8] = [
    "api reference",
    "documentation",
    "overview",
    "introduction",
    "getting started",
    "authentication",
    "guides",
    "home",
];

/// Verbs that open an endpoint title.
const ENDPOINT_VERBS: [&str; 12] = [
    "Get ", "Create ", "Update ", "Delete ", "Add ", "Remove ", "Set ", "Fetch ", "Generate ",
    "Send ", "Mark ", "Apply ",
];

/// Top-level sections some API references group their endpoints under.
const SECTION_NAMES: [&str; 5] = ["Billing", "Accounts", "Reports", "Users", "Settings"];

const MAX_NESTING_LEVEL: u8 = 3;

static NUMERIC_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d\s\-_.]+$").expect("valid numeric label regex"));
static SENTENCE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-z]+ .+").expect("valid sentence regex"));
static VERB_LED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(get|post|put|delete|create|update|list|fetch|retrieve)\s")
        .expect("valid verb regex")
});
static ENDPOINT_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(Get|Post|Put|Delete|Create|Update|List|Fetch)\s").expect("valid label regex")
});
static ACTION_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-z]+\s[a-z]").expect("valid action regex"));
static TITLE_CASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-z]+(\s[a-z]+)*$").expect("valid title case regex"));
static SECTION_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z\s]*$").expect("valid section regex"));
static IMPORTANT_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(get|post|put|delete|create|update|list)\s").expect("valid verb regex")
});
static LOWER_ACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]+\s[a-z]").expect("valid lower action regex"));

/// Where the link was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkContext {
    /// Host of the page being scraped
    pub host: String,
    /// Path of the page being scraped
    pub current_path: String,
}

impl LinkContext {
    /// Build a context from the current location.
    #[must_use]
    pub fn from_location(location: &str) -> Self {
        url::Url::parse(location)
            .map(|url| Self {
                host: url.host_str().unwrap_or_default().to_string(),
                current_path: url.path().to_string(),
            })
            .unwrap_or_default()
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Documentation-like target, or any relative link while on a docs page.
#[must_use]
pub fn is_documentation_link(href: &str, current_path: &str) -> bool {
    if href.is_empty() || href == "#" || href.starts_with("mailto:") || href.starts_with("tel:") {
        return false;
    }

    let doc_path = DOC_PATHS
        .iter()
        .any(|pattern| href.contains(pattern) || current_path.contains(pattern));
    let relative_on_docs = href.starts_with('/') && current_path.contains("/docs");

    doc_path || relative_on_docs
}

/// Legacy content filter: no chrome terms, a real label, and an allow signal or
/// a reasonably long title.
#[must_use]
pub fn is_meaningful_link(text: &str, href: &str) -> bool {
    let text_lower = text.to_lowercase();
    if contains_any(&text_lower, &LEGACY_DENY_TERMS) {
        return false;
    }
    if text.chars().count() < 2 || NUMERIC_LABEL.is_match(text) {
        return false;
    }

    let href_lower = href.to_lowercase();
    if href_lower.contains("/reference/") || href_lower.contains("/api/") {
        return true;
    }

    let allowed = ALLOW_TERMS
        .iter()
        .any(|term| text_lower.contains(term) || href_lower.contains(term));
    allowed || text.chars().count() > 5
}

/// Endpoint filter for known API reference sites.
#[must_use]
pub fn is_valid_endpoint(text: &str, href: &str) -> bool {
    if !href.contains("/reference/") {
        return false;
    }

    let len = text.chars().count();
    if !(5..=100).contains(&len) {
        return false;
    }

    let text_lower = text.to_lowercase();
    if GENERIC_ENDPOINT_TITLES.contains(&text_lower.as_str()) {
        return false;
    }

    contains_any(text, &["get", "post", "put", "delete"])
        || contains_any(text, &ENDPOINT_VERBS)
        || SENTENCE_SHAPE.is_match(text)
}

/// Absolute link to some other host.
#[must_use]
pub fn is_external(href: &str, ctx: &LinkContext) -> bool {
    href.starts_with("http") && (ctx.host.is_empty() || !href.contains(&ctx.host))
}

/// Filter shared by the discovery strategies.
#[must_use]
pub fn is_valid_documentation_link(href: &str, text: &str, ctx: &LinkContext) -> bool {
    let len = text.chars().count();
    if href.is_empty() || !(3..=200).contains(&len) {
        return false;
    }

    let text_lower = text.to_lowercase();
    let href_lower = href.to_lowercase();
    if BOILERPLATE_TERMS
        .iter()
        .any(|term| text_lower.contains(term) || href_lower.contains(term))
    {
        return false;
    }

    if is_external(href, ctx) {
        return false;
    }

    href.starts_with('/')
        || href.starts_with('#')
        || href.contains("/docs")
        || href.contains("/api")
        || href.contains("/reference")
}

/// Combined gate for a candidate page.
#[derive(Debug, Clone, Default)]
pub struct LinkClassifier {
    ctx: LinkContext,
}

impl LinkClassifier {
    /// Classifier for links found on the page at `ctx`.
    #[must_use]
    pub fn new(ctx: LinkContext) -> Self {
        Self { ctx }
    }

    /// Not external, not boilerplate, and either under a documentation path or
    /// carrying a content signal.
    #[must_use]
    pub fn accepts(&self, text: &str, href: &str) -> bool {
        let text_lower = text.to_lowercase();
        let href_lower = href.to_lowercase();
        if PAGE_DENY_TERMS
            .iter()
            .any(|term| text_lower.contains(term) || href_lower.contains(term))
        {
            return false;
        }

        if is_external(href, &self.ctx) {
            return false;
        }

        if text.is_empty() || text == "Link" || text == "Click here" || text.chars().count() < 3 {
            return false;
        }

        let doc_url = ["/reference/", "/api/", "/docs/", "/guide"]
            .iter()
            .any(|p| href.contains(p));
        let content_signal = VERB_LED.is_match(text)
            || text.contains("API")
            || text.contains("endpoint")
            || TITLE_CASE.is_match(text);

        doc_url || content_signal || (href.starts_with('/') && text.chars().count() > 3)
    }
}

/// Structural hints gathered around a link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NestingSignals {
    /// Enclosing `ul`/`ol` elements
    pub list_depth: usize,
    /// Inside an `[aria-expanded="true"]` container
    pub in_expanded: bool,
    /// Inside an element whose class mentions nested/sub/child
    pub in_nested_class: bool,
    /// Three or more `div` levels under the sidebar
    pub in_deep_sidebar: bool,
}

/// Label looks like an endpoint rather than a section.
#[must_use]
pub fn looks_like_endpoint(text: &str) -> bool {
    ENDPOINT_LABEL.is_match(text)
        || text.contains("API")
        || text.contains("endpoint")
        || ACTION_OBJECT.is_match(text)
}

/// Heuristic depth of a link in its navigation tree, 0 to 3.
#[must_use]
pub fn nesting_level(text: &str, signals: NestingSignals) -> u8 {
    let mut level = u8::try_from(signals.list_depth).unwrap_or(u8::MAX);

    if signals.in_expanded || signals.in_nested_class || signals.in_deep_sidebar {
        level = level.max(2);
    }
    if looks_like_endpoint(text) {
        level = level.max(2);
    }

    let section_header = text.chars().count() < 20
        && SECTION_HEADER.is_match(text)
        && SECTION_NAMES.contains(&text);
    if section_header && level < 2 {
        level = 1;
    }

    level.min(MAX_NESTING_LEVEL)
}

/// Ordering weight: API paths first, then verb-led titles and guides.
#[must_use]
pub fn importance_score(title: &str, href: &str) -> u32 {
    let text = title.to_lowercase();
    let href = href.to_lowercase();
    let mut score = 0;

    if href.contains("/reference/") || href.contains("/api/") {
        score += 100;
    }
    if IMPORTANT_VERB.is_match(title) {
        score += 50;
    }
    if href.contains("/docs/") || href.contains("/guide") {
        score += 30;
    }
    if text.contains("api") || text.contains("endpoint") {
        score += 20;
    }
    if LOWER_ACTION.is_match(&text) {
        score += 10;
    }
    score
}
