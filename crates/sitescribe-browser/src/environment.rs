use crate::dom::DomNode;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Short-lived reference to an element of the live page.
///
/// Only valid until the page replaces the element. Using it afterwards yields
/// [`crate::BrowserError::StaleElement`]. Deliberately not serializable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(u64);

impl ElementHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Low-level notification dispatched to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    MouseDown,
    MouseUp,
    PointerDown,
    PointerUp,
    EnterKey,
    SpaceKey,
}

impl InputEvent {
    /// DOM event type name.
    pub fn event_type(self) -> &'static str {
        match self {
            Self::MouseDown => "mousedown",
            Self::MouseUp => "mouseup",
            Self::PointerDown => "pointerdown",
            Self::PointerUp => "pointerup",
            Self::EnterKey | Self::SpaceKey => "keydown",
        }
    }

    /// `KeyboardEvent.key` for keyboard events.
    pub fn key(self) -> Option<&'static str> {
        match self {
            Self::EnterKey => Some("Enter"),
            Self::SpaceKey => Some(" "),
            _ => None,
        }
    }

    /// The pointer sequence tried before keyboard activation.
    pub const POINTER_SEQUENCE: [InputEvent; 4] = [
        Self::MouseDown,
        Self::MouseUp,
        Self::PointerDown,
        Self::PointerUp,
    ];
}

/// What accompanies a direct location change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationNotice {
    /// Rewrite the location silently
    Silent,
    /// `history.pushState` followed by a `popstate` event
    PopState,
    /// Fragment assignment followed by a `hashchange` event
    HashChange,
    /// Full document load
    Load,
}

/// Tag, attributes and trimmed text of an element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    pub text: String,
}

impl ElementInfo {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn class_name(&self) -> &str {
        self.attr("class").unwrap_or_default()
    }

    pub fn id(&self) -> &str {
        self.attr("id").unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_name().split_whitespace().any(|c| c == class)
    }
}

/// Content of an embedded frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "access", rename_all = "lowercase")]
pub enum FrameContent {
    /// Same-origin frame whose body could be read
    Accessible { src: Option<String>, body: DomNode },
    /// Cross-origin frame; only its source is known
    Restricted { src: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMetrics {
    pub scroll_height: u64,
    pub viewport_height: u64,
}

/// Script-level signals that cannot be read from markup alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeHints {
    pub history_api: bool,
    pub framework_globals: bool,
}

/// Capability surface of a live page.
///
/// Everything the scraper does to a site goes through this trait: the
/// Chromium page drives a real browser over CDP and [`crate::StaticSite`]
/// replays captured HTML in memory.
#[async_trait::async_trait]
pub trait PageEnvironment: Send + Sync {
    /// Current location, including fragment
    async fn location(&self) -> Result<String>;

    /// Mutate the location directly
    async fn set_location(&self, url: &str, notice: LocationNotice) -> Result<()>;

    /// All elements matching `selector`, in document order
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>>;

    /// Descendants of `scope` matching `selector`
    async fn query_within(&self, scope: ElementHandle, selector: &str)
        -> Result<Vec<ElementHandle>>;

    /// Nearest inclusive ancestor matching `selector`
    async fn closest(&self, element: ElementHandle, selector: &str)
        -> Result<Option<ElementHandle>>;

    /// Whether `inner` is `outer` or one of its descendants
    async fn contains(&self, outer: ElementHandle, inner: ElementHandle) -> Result<bool>;

    async fn describe(&self, element: ElementHandle) -> Result<ElementInfo>;

    async fn inner_markup(&self, element: ElementHandle) -> Result<String>;

    /// Lowercase tags of the ancestors, nearest first
    async fn ancestor_tags(&self, element: ElementHandle) -> Result<Vec<String>>;

    /// Computed visibility of the element and its ancestors
    async fn is_visible(&self, element: ElementHandle) -> Result<bool>;

    async fn scroll_into_view(&self, element: ElementHandle) -> Result<()>;

    /// Click-equivalent activation
    async fn activate(&self, element: ElementHandle) -> Result<()>;

    async fn dispatch_input(&self, element: ElementHandle, event: InputEvent) -> Result<()>;

    /// Serializable copy of the subtree rooted at `element`
    async fn snapshot(&self, element: ElementHandle) -> Result<DomNode>;

    async fn frames(&self) -> Result<Vec<FrameContent>>;

    async fn scroll_metrics(&self) -> Result<ScrollMetrics>;

    async fn scroll_to(&self, y: u64) -> Result<()>;

    async fn runtime_hints(&self) -> Result<RuntimeHints>;

    async fn count(&self, selector: &str) -> Result<usize> {
        Ok(self.query_all(selector).await?.len())
    }

    async fn first(&self, selector: &str) -> Result<Option<ElementHandle>> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    async fn text_of(&self, element: ElementHandle) -> Result<String> {
        Ok(self.describe(element).await?.text)
    }
}

/// Resolve `href` against `base`, returning `href` unchanged if either is unparsable.
pub fn resolve_url(base: &str, href: &str) -> String {
    url::Url::parse(base)
        .and_then(|base| base.join(href))
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

/// `url` with any fragment removed.
pub fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}
