//! Site classification produced once per session by structure analysis.
//!
//! A [`SiteProfile`] is plain data: navigation areas and disclosure controls
//! are recorded as `(selector, index)` locators, never as live element handles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Documentation platform the site appears to be built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SiteType {
    /// Known site with a dedicated discovery strategy
    Subskribe,
    /// GitBook
    #[serde(rename = "gitbook")]
    GitBook,
    /// Notion
    Notion,
    /// Atlassian Confluence
    Confluence,
    /// Gitiles source browser
    Gitiles,
    /// Sphinx generated docs
    Sphinx,
    /// `MkDocs` generated docs
    #[serde(rename = "mkdocs")]
    MkDocs,
    /// Docusaurus
    Docusaurus,
    /// `ReadMe` hosted docs
    #[serde(rename = "readme")]
    ReadMe,
    /// Intercom help center
    Intercom,
    /// Zendesk help center
    Zendesk,
    /// Slate API docs
    Slate,
    /// Swagger UI
    Swagger,
    /// Redoc
    Redoc,
    /// Postman documenter
    Postman,
    /// Unrecognized platform serving docs-like paths
    CustomDocs,
    /// Title mentions docs but nothing more specific matched
    GenericDocs,
    /// No signal at all
    #[default]
    Unknown,
}

impl SiteType {
    /// Whether the site has a dedicated discovery strategy.
    #[must_use]
    pub fn is_known_site(self) -> bool {
        matches!(self, Self::Subskribe)
    }
}

/// Dominant navigation idiom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NavigationStyle {
    /// Sidebar with collapsible groups
    SidebarExpandable,
    /// Sidebar that is fully rendered
    SidebarStatic,
    /// Header dropdown menus
    TopNavDropdown,
    /// Accordion or `details` groups
    Accordion,
    /// Tree widget
    TreeNav,
    /// Tab strip
    Tabbed,
    /// Mega menu
    MegaMenu,
    /// Plain list of links
    SimpleList,
    /// No idiom passed its threshold
    #[default]
    Unknown,
}

/// How content is spread across locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentPattern {
    /// Client-side routed application
    SinglePageApp,
    /// One document per location
    MultiPageStatic,
    /// Sections addressed by fragment
    HashRouted,
    /// Endpoint-per-page API reference
    ApiReference,
    /// Guides and tutorials
    GuideBased,
    /// Wiki
    WikiStyle,
    /// Nothing matched
    #[default]
    Unknown,
}

macro_rules! kebab_names {
    ($ty:ty { $($variant:ident => $name:literal),* $(,)? }) => {
        impl $ty {
            /// Wire name of the variant.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),*
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

kebab_names!(SiteType {
    Subskribe => "subskribe",
    GitBook => "gitbook",
    Notion => "notion",
    Confluence => "confluence",
    Gitiles => "gitiles",
    Sphinx => "sphinx",
    MkDocs => "mkdocs",
    Docusaurus => "docusaurus",
    ReadMe => "readme",
    Intercom => "intercom",
    Zendesk => "zendesk",
    Slate => "slate",
    Swagger => "swagger",
    Redoc => "redoc",
    Postman => "postman",
    CustomDocs => "custom-docs",
    GenericDocs => "generic-docs",
    Unknown => "unknown",
});

kebab_names!(NavigationStyle {
    SidebarExpandable => "sidebar-expandable",
    SidebarStatic => "sidebar-static",
    TopNavDropdown => "top-nav-dropdown",
    Accordion => "accordion",
    TreeNav => "tree-nav",
    Tabbed => "tabbed",
    MegaMenu => "mega-menu",
    SimpleList => "simple-list",
    Unknown => "unknown",
});

kebab_names!(ContentPattern {
    SinglePageApp => "single-page-app",
    MultiPageStatic => "multi-page-static",
    HashRouted => "hash-routed",
    ApiReference => "api-reference",
    GuideBased => "guide-based",
    WikiStyle => "wiki-style",
    Unknown => "unknown",
});

/// A navigation container worth mining for links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationArea {
    /// Selector the container was found with
    pub selector: String,
    /// Position among that selector's matches
    pub index: usize,
    /// Links inside the container
    pub link_count: usize,
    /// Disclosure controls inside the container
    pub expandable_count: usize,
}

/// A disclosure control seen during analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandableSummary {
    /// Selector the control was found with
    pub selector: String,
    /// Position among that selector's matches
    pub index: usize,
    /// Visible label
    pub text: String,
    /// Whether it wraps a nested list or submenu
    pub has_children: bool,
}

/// A recurring href shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPattern {
    /// Href with its last segment dropped and digits replaced by `ID`
    pub pattern: String,
    /// Number of links sharing the shape
    pub count: usize,
    /// Up to three `(text, href)` samples
    pub examples: Vec<(String, String)>,
}

/// Best-scoring selector for one structural role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialSelector {
    /// Selector
    pub selector: String,
    /// Matches on the page when analyzed
    pub count: usize,
}

/// Classification record describing a site's navigation idiom and content pattern.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteProfile {
    /// Detected platform
    pub site_type: SiteType,
    /// Detected navigation idiom
    pub navigation_style: NavigationStyle,
    /// Detected content layout
    pub content_pattern: ContentPattern,
    /// Navigation containers, most links first
    pub navigation_areas: Vec<NavigationArea>,
    /// Disclosure controls seen at analysis time
    pub expandable_elements: Vec<ExpandableSummary>,
    /// Recurring href shapes, most frequent first
    pub link_patterns: Vec<LinkPattern>,
    /// Role name to best selector (`main_navigation`, `api_endpoints`, ...)
    pub special_selectors: BTreeMap<String, SpecialSelector>,
    /// Additive 0-100 diagnostic score
    pub confidence: u8,
}

impl SiteProfile {
    /// Recompute `confidence` from the detected signals.
    pub fn score_confidence(&mut self) {
        let mut confidence = 0u8;
        if self.site_type != SiteType::Unknown {
            confidence += 25;
        }
        if self.navigation_style != NavigationStyle::Unknown {
            confidence += 25;
        }
        if self.content_pattern != ContentPattern::Unknown {
            confidence += 20;
        }
        if !self.navigation_areas.is_empty() {
            confidence += 15;
        }
        if !self.expandable_elements.is_empty() {
            confidence += 10;
        }
        if !self.link_patterns.is_empty() {
            confidence += 5;
        }
        self.confidence = confidence;
    }

    /// Primary navigation container, if any was found.
    #[must_use]
    pub fn primary_navigation(&self) -> Option<&NavigationArea> {
        self.navigation_areas.first()
    }
}
