//! Site structure analysis.
//!
//! Reads the current page once and classifies its platform, navigation idiom
//! and content layout. Missing signals classify as `Unknown`; only transport
//! errors from the environment are returned.

use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use sitescribe_browser::PageEnvironment;
use sitescribe_core::{
    ContentPattern, ExpandableSummary, LinkPattern, NavigationArea, NavigationStyle, SiteProfile,
    SiteType, SpecialSelector,
};
use std::collections::{BTreeMap, HashMap};

/// Idiom, selector and the count it must exceed.
const NAVIGATION_IDIOMS: [(NavigationStyle, &str, usize); 8] = [
    (
        NavigationStyle::SidebarExpandable,
        ".sidebar [aria-expanded], nav [aria-expanded]",
        3,
    ),
    (NavigationStyle::SidebarStatic, ".sidebar ul li, nav ul li", 10),
    (
        NavigationStyle::TopNavDropdown,
        "header .dropdown, .top-nav .dropdown",
        2,
    ),
    (
        NavigationStyle::Accordion,
        "details, .accordion, [data-accordion]",
        3,
    ),
    (NavigationStyle::TreeNav, ".tree, [role=\"tree\"], .nav-tree", 0),
    (NavigationStyle::Tabbed, "[role=\"tab\"], .tabs, .tab-nav", 3),
    (NavigationStyle::MegaMenu, ".mega-menu, .large-nav", 0),
    (NavigationStyle::SimpleList, "nav ul, .nav ul", 0),
];

const NAVIGATION_AREA_SELECTORS: [&str; 14] = [
    "nav",
    ".navigation",
    ".nav",
    ".sidebar",
    ".side-nav",
    ".docs-nav",
    ".menu",
    ".toc",
    ".table-of-contents",
    "aside",
    ".aside",
    "[role=\"navigation\"]",
    ".nav-menu",
    ".sidebar-nav",
];

const EXPANDABLE_SELECTORS: [&str; 8] = [
    "details",
    "[aria-expanded=\"false\"]",
    ".expandable",
    ".collapsible",
    ".accordion-item",
    "button[aria-expanded]",
    ".dropdown-toggle",
    ".nav-toggle",
];

const SPECIAL_ROLES: [(&str, &[&str]); 5] = [
    (
        "main_navigation",
        &["nav", ".sidebar", ".navigation", ".docs-nav", ".menu"],
    ),
    (
        "section_headers",
        &["h1", "h2", ".section-header", ".nav-header", ".category-header"],
    ),
    (
        "api_endpoints",
        &[
            "a[href*=\"/api/\"]",
            "a[href*=\"/reference/\"]",
            ".endpoint",
            ".api-method",
        ],
    ),
    (
        "content_area",
        &["main", ".content", ".main-content", ".docs-content", "[role=\"main\"]"],
    ),
    (
        "expand_buttons",
        &["[aria-expanded]", "details summary", ".expand-btn", ".toggle"],
    ),
];

const MIN_AREA_LINKS: usize = 3;
const MAX_EXPANDABLE_TEXT: usize = 100;
const MIN_PATTERN_LINKS: usize = 2;
const PATTERN_EXAMPLES: usize = 3;
const SPA_INDICATORS_REQUIRED: usize = 2;

static LAST_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/[^/]*$").expect("valid segment regex"));
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid digits regex"));

/// Raw signals used to name the platform.
#[derive(Debug, Clone, Default)]
pub struct SiteSignals {
    /// Location host
    pub host: String,
    /// Location path
    pub path: String,
    /// Document title
    pub title: String,
    /// `class` attribute of `body`
    pub body_classes: String,
    /// `.sphinxsidebar` is present
    pub sphinx_sidebar: bool,
    /// `.md-nav` is present
    pub material_nav: bool,
    /// An element carries `data-theme`
    pub themed_root: bool,
    /// `.slate` is present
    pub slate_markup: bool,
    /// `.swagger-ui` is present
    pub swagger_ui: bool,
    /// A `redoc` element is present
    pub redoc_element: bool,
}

/// Name the platform from its signals. The known-site signature wins.
#[must_use]
pub fn classify_site_type(s: &SiteSignals) -> SiteType {
    let host = s.host.to_lowercase();
    let path = s.path.to_lowercase();
    let title = s.title.to_lowercase();
    let body = s.body_classes.to_lowercase();

    let battery = [
        (SiteType::Subskribe, host.contains("subskribe")),
        (
            SiteType::GitBook,
            host.contains("gitbook") || body.contains("gitbook"),
        ),
        (
            SiteType::Notion,
            host.contains("notion") || body.contains("notion"),
        ),
        (
            SiteType::Confluence,
            host.contains("confluence") || body.contains("confluence"),
        ),
        (
            SiteType::Gitiles,
            host.contains("gitiles") || path.contains("gitiles"),
        ),
        (SiteType::Sphinx, body.contains("sphinx") || s.sphinx_sidebar),
        (SiteType::MkDocs, body.contains("mkdocs") || s.material_nav),
        (
            SiteType::Docusaurus,
            body.contains("docusaurus") || s.themed_root,
        ),
        (
            SiteType::ReadMe,
            host.contains("readme.") || body.contains("readme"),
        ),
        (
            SiteType::Intercom,
            host.contains("intercom") || body.contains("intercom"),
        ),
        (
            SiteType::Zendesk,
            host.contains("zendesk") || body.contains("zendesk"),
        ),
        (SiteType::Slate, body.contains("slate") || s.slate_markup),
        (SiteType::Swagger, title.contains("swagger") || s.swagger_ui),
        (SiteType::Redoc, body.contains("redoc") || s.redoc_element),
        (
            SiteType::Postman,
            host.contains("postman") || body.contains("postman"),
        ),
        (
            SiteType::CustomDocs,
            ["/docs", "/reference", "/api"]
                .iter()
                .any(|p| path.contains(p)),
        ),
    ];

    if let Some((site_type, _)) = battery.into_iter().find(|(_, matched)| *matched) {
        return site_type;
    }

    if ["docs", "documentation", "api"]
        .iter()
        .any(|word| title.contains(word))
    {
        return SiteType::GenericDocs;
    }
    SiteType::Unknown
}

/// Highest-count idiom among those above their threshold; earlier idioms win ties.
#[must_use]
pub fn pick_navigation_style(counts: &[(NavigationStyle, usize, usize)]) -> NavigationStyle {
    let mut best: Option<(NavigationStyle, usize)> = None;
    for &(style, count, threshold) in counts {
        if count <= threshold {
            continue;
        }
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((style, count));
        }
    }
    best.map_or(NavigationStyle::Unknown, |(style, _)| style)
}

/// Link counts and SPA indicators used to pick a content pattern.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentSignals {
    /// SPA indicators that fired, out of 5
    pub spa_indicators: usize,
    /// Root-relative or `html` links
    pub internal_links: usize,
    /// Links that are bare fragments
    pub hash_links: usize,
    /// Links under reference or API paths
    pub reference_links: usize,
    /// Links under guide or tutorial paths
    pub guide_links: usize,
    /// Wiki links or `.wiki` elements
    pub wiki_markers: usize,
}

/// Pick the content pattern from link counts and SPA indicators.
#[must_use]
pub fn classify_content_pattern(s: &ContentSignals) -> ContentPattern {
    if s.spa_indicators >= SPA_INDICATORS_REQUIRED {
        ContentPattern::SinglePageApp
    } else if s.internal_links > 10 {
        ContentPattern::MultiPageStatic
    } else if s.hash_links > 5 {
        ContentPattern::HashRouted
    } else if s.reference_links > 5 {
        ContentPattern::ApiReference
    } else if s.guide_links > 3 {
        ContentPattern::GuideBased
    } else if s.wiki_markers > 0 {
        ContentPattern::WikiStyle
    } else {
        ContentPattern::Unknown
    }
}

/// Shape of an href: last segment dropped, digit runs replaced by `ID`.
#[must_use]
pub fn href_shape(href: &str) -> String {
    let trimmed = LAST_SEGMENT.replace(href, "/");
    DIGITS.replace_all(&trimmed, "ID").into_owned()
}

/// Group `(text, href)` pairs by href shape, keeping shapes seen more than twice.
#[must_use]
pub fn link_patterns(links: &[(String, String)]) -> Vec<LinkPattern> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<(String, String)>> = HashMap::new();

    for (text, href) in links {
        if href.is_empty() || text.is_empty() {
            continue;
        }
        let shape = href_shape(href);
        let group = groups.entry(shape.clone()).or_default();
        if group.is_empty() {
            order.push(shape);
        }
        group.push((text.clone(), href.clone()));
    }

    let mut patterns: Vec<LinkPattern> = order
        .into_iter()
        .filter_map(|shape| {
            let group = groups.remove(&shape)?;
            (group.len() > MIN_PATTERN_LINKS).then(|| LinkPattern {
                count: group.len(),
                examples: group.into_iter().take(PATTERN_EXAMPLES).collect(),
                pattern: shape,
            })
        })
        .collect();
    patterns.sort_by(|a, b| b.count.cmp(&a.count));
    patterns
}

/// Classifies the page currently loaded in an environment.
pub struct SiteAnalyzer<'a> {
    env: &'a dyn PageEnvironment,
}

impl<'a> SiteAnalyzer<'a> {
    /// Analyzer for the page shown in `env`.
    pub fn new(env: &'a dyn PageEnvironment) -> Self {
        Self { env }
    }

    /// Build the site profile.
    pub async fn analyze(&self) -> Result<SiteProfile> {
        tracing::debug!("Analyzing site structure");

        let mut profile = SiteProfile {
            site_type: classify_site_type(&self.site_signals().await?),
            navigation_style: self.detect_navigation_style().await?,
            content_pattern: classify_content_pattern(&self.content_signals().await?),
            navigation_areas: self.find_navigation_areas().await?,
            expandable_elements: self.find_expandable_elements().await?,
            link_patterns: link_patterns(&self.collect_links().await?),
            special_selectors: self.find_special_selectors().await?,
            confidence: 0,
        };
        profile.score_confidence();

        tracing::info!(
            "Site profile: type={}, navigation={}, content={}, confidence={}%",
            profile.site_type,
            profile.navigation_style,
            profile.content_pattern,
            profile.confidence
        );
        Ok(profile)
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.env.count(selector).await? > 0)
    }

    async fn site_signals(&self) -> Result<SiteSignals> {
        let location = self.env.location().await?;
        let (host, path) = url::Url::parse(&location)
            .map(|url| {
                (
                    url.host_str().unwrap_or_default().to_string(),
                    url.path().to_string(),
                )
            })
            .unwrap_or_default();

        let title = match self.env.first("title").await? {
            Some(title) => self.env.text_of(title).await?,
            None => String::new(),
        };
        let body_classes = match self.env.first("body").await? {
            Some(body) => self.env.describe(body).await?.class_name().to_string(),
            None => String::new(),
        };

        Ok(SiteSignals {
            host,
            path,
            title,
            body_classes,
            sphinx_sidebar: self.exists(".sphinxsidebar").await?,
            material_nav: self.exists(".md-nav").await?,
            themed_root: self.exists("[data-theme]").await?,
            slate_markup: self.exists(".slate").await?,
            swagger_ui: self.exists(".swagger-ui").await?,
            redoc_element: self.exists("redoc").await?,
        })
    }

    async fn detect_navigation_style(&self) -> Result<NavigationStyle> {
        let mut counts = Vec::with_capacity(NAVIGATION_IDIOMS.len());
        for (style, selector, threshold) in NAVIGATION_IDIOMS {
            counts.push((style, self.env.count(selector).await?, threshold));
        }
        Ok(pick_navigation_style(&counts))
    }

    async fn content_signals(&self) -> Result<ContentSignals> {
        let hints = self.env.runtime_hints().await?;
        let location = self.env.location().await?;
        let hash_links = self.env.count("a[href^=\"#\"]").await?;

        let on_docs_path = url::Url::parse(&location)
            .map(|url| url.path().contains("/docs"))
            .unwrap_or(false);

        let indicators = [
            hints.history_api,
            self.exists("[data-react-root], [data-reactroot], #root, #app")
                .await?,
            hints.framework_globals,
            self.exists(
                "script[src*=\"react\"], script[src*=\"vue\"], script[src*=\"angular\"]",
            )
            .await?,
            on_docs_path && hash_links > 5,
        ];
        let spa_indicators = indicators.iter().filter(|hit| **hit).count();
        tracing::debug!("SPA detection: {}/5 indicators", spa_indicators);

        Ok(ContentSignals {
            spa_indicators,
            internal_links: self.env.count("a[href^=\"/\"], a[href*=\"html\"]").await?,
            hash_links,
            reference_links: self
                .env
                .count("a[href*=\"/reference/\"], a[href*=\"/api/\"]")
                .await?,
            guide_links: self
                .env
                .count("a[href*=\"/guide\"], a[href*=\"/tutorial\"]")
                .await?,
            wiki_markers: self.env.count("a[href*=\"/wiki/\"], .wiki").await?,
        })
    }

    async fn find_navigation_areas(&self) -> Result<Vec<NavigationArea>> {
        let mut areas = Vec::new();
        for selector in NAVIGATION_AREA_SELECTORS {
            for (index, element) in self.env.query_all(selector).await?.into_iter().enumerate() {
                let link_count = self.env.query_within(element, "a").await?.len();
                if link_count <= MIN_AREA_LINKS {
                    continue;
                }
                let expandable_count = self
                    .env
                    .query_within(element, "[aria-expanded], details, .expandable")
                    .await?
                    .len();
                areas.push(NavigationArea {
                    selector: selector.to_string(),
                    index,
                    link_count,
                    expandable_count,
                });
            }
        }
        areas.sort_by(|a, b| b.link_count.cmp(&a.link_count));
        tracing::debug!("Found {} navigation areas", areas.len());
        Ok(areas)
    }

    async fn find_expandable_elements(&self) -> Result<Vec<ExpandableSummary>> {
        let mut expandables = Vec::new();
        for selector in EXPANDABLE_SELECTORS {
            for (index, element) in self.env.query_all(selector).await?.into_iter().enumerate() {
                let text = self.env.text_of(element).await?;
                let len = text.chars().count();
                if len == 0 || len >= MAX_EXPANDABLE_TEXT {
                    continue;
                }
                let has_children = !self
                    .env
                    .query_within(element, "ul, ol, .submenu")
                    .await?
                    .is_empty();
                expandables.push(ExpandableSummary {
                    selector: selector.to_string(),
                    index,
                    text,
                    has_children,
                });
            }
        }
        tracing::debug!("Found {} expandable elements", expandables.len());
        Ok(expandables)
    }

    async fn collect_links(&self) -> Result<Vec<(String, String)>> {
        let mut links = Vec::new();
        for element in self.env.query_all("a[href]").await? {
            let info = self.env.describe(element).await?;
            let href = info.attr("href").unwrap_or_default().to_string();
            links.push((info.text, href));
        }
        Ok(links)
    }

    async fn find_special_selectors(&self) -> Result<BTreeMap<String, SpecialSelector>> {
        let mut selectors = BTreeMap::new();
        for (role, candidates) in SPECIAL_ROLES {
            let mut best: Option<SpecialSelector> = None;
            for selector in candidates {
                let count = self.env.count(selector).await?;
                if count > best.as_ref().map_or(0, |b| b.count) {
                    best = Some(SpecialSelector {
                        selector: (*selector).to_string(),
                        count,
                    });
                }
            }
            if let Some(best) = best {
                selectors.insert(role.to_string(), best);
            }
        }
        Ok(selectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_site_checked_first() {
        let signals = SiteSignals {
            host: "docs.subskribe.com".to_string(),
            path: "/reference/overview".to_string(),
            body_classes: "docusaurus".to_string(),
            ..SiteSignals::default()
        };
        assert_eq!(classify_site_type(&signals), SiteType::Subskribe);
    }

    #[test]
    fn test_site_type_battery() {
        let sphinx = SiteSignals {
            sphinx_sidebar: true,
            ..SiteSignals::default()
        };
        assert_eq!(classify_site_type(&sphinx), SiteType::Sphinx);

        let custom = SiteSignals {
            host: "example.com".to_string(),
            path: "/docs/start".to_string(),
            ..SiteSignals::default()
        };
        assert_eq!(classify_site_type(&custom), SiteType::CustomDocs);

        let generic = SiteSignals {
            title: "Acme API Documentation".to_string(),
            ..SiteSignals::default()
        };
        assert_eq!(classify_site_type(&generic), SiteType::GenericDocs);
        assert_eq!(classify_site_type(&SiteSignals::default()), SiteType::Unknown);
    }

    #[test]
    fn test_navigation_style_prefers_highest_count() {
        let counts = [
            (NavigationStyle::SidebarExpandable, 2, 3),
            (NavigationStyle::SidebarStatic, 40, 10),
            (NavigationStyle::Accordion, 5, 3),
            (NavigationStyle::SimpleList, 3, 0),
        ];
        assert_eq!(pick_navigation_style(&counts), NavigationStyle::SidebarStatic);

        let none = [(NavigationStyle::TreeNav, 0, 0)];
        assert_eq!(pick_navigation_style(&none), NavigationStyle::Unknown);
    }

    #[test]
    fn test_content_pattern_order() {
        let spa = ContentSignals {
            spa_indicators: 2,
            internal_links: 50,
            ..ContentSignals::default()
        };
        assert_eq!(classify_content_pattern(&spa), ContentPattern::SinglePageApp);

        let api = ContentSignals {
            spa_indicators: 1,
            reference_links: 8,
            ..ContentSignals::default()
        };
        assert_eq!(classify_content_pattern(&api), ContentPattern::ApiReference);

        assert_eq!(
            classify_content_pattern(&ContentSignals::default()),
            ContentPattern::Unknown
        );
    }

    #[test]
    fn test_link_patterns() {
        let links: Vec<(String, String)> = [
            ("Get user", "/api/v1/users/get"),
            ("List users", "/api/v1/users/list"),
            ("Delete user", "/api/v1/users/delete"),
            ("Create user", "/api/v1/users/create"),
            ("Home", "/"),
            ("", "/api/v1/users/empty"),
        ]
        .iter()
        .map(|(t, h)| ((*t).to_string(), (*h).to_string()))
        .collect();

        let patterns = link_patterns(&links);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].pattern, "/api/vID/users/");
        assert_eq!(patterns[0].count, 4);
        assert_eq!(patterns[0].examples.len(), 3);
    }
}
