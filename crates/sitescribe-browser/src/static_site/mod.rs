//! In-memory page environment backed by captured HTML.
//!
//! `StaticSite` replays a set of pages without a browser. It understands the
//! handful of behaviors the scraper relies on: disclosure toggles
//! (`aria-expanded`, `details`, `collapsed` classes), link routing either by
//! swapping the `main` region (client-side) or by replacing the whole document
//! (full reload), `popstate`/`hashchange` handling, and `srcdoc` frames.
//!
//! An element's `data-activation` attribute (nearest inclusive ancestor wins)
//! names the DOM event that triggers its behavior: `click` (default),
//! `mousedown`, `mouseup`, `pointerdown`, `pointerup`, `keydown`, or `none`.

mod tree;

use crate::dom::DomNode;
use crate::environment::{
    resolve_url, strip_fragment, ElementHandle, ElementInfo, FrameContent, InputEvent,
    LocationNotice, PageEnvironment, RuntimeHints, ScrollMetrics,
};
use crate::error::{BrowserError, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tree::DomTree;

const NOT_FOUND_HTML: &str = "<html><head><title>Not Found</title></head>\
    <body><main><h1>Page not found</h1></main></body></html>";

const LINE_HEIGHT: u64 = 24;
const VIEWPORT_HEIGHT: u64 = 800;

/// How link activation changes the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Routing {
    /// Location is pushed and only the `main` region is replaced
    #[default]
    ClientSide,
    /// The whole document is replaced; every handle goes stale
    FullReload,
}

/// One recorded event delivered to an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub tag: String,
    pub text: String,
    pub event: String,
}

struct SiteState {
    location: String,
    pages: HashMap<String, String>,
    routing: Routing,
    hints: RuntimeHints,
    tree: DomTree,
    generation: u32,
    scroll_y: u64,
    activations: Vec<Activation>,
}

/// Offline [`PageEnvironment`] over a fixed set of HTML pages.
pub struct StaticSite {
    state: Mutex<SiteState>,
}

fn page_key(url: &str) -> String {
    url::Url::parse(url)
        .map(String::from)
        .unwrap_or_else(|_| url.to_string())
}

impl StaticSite {
    /// Open `html` at `start_url`.
    pub fn new(start_url: &str, html: &str) -> Result<Self> {
        let location = url::Url::parse(start_url)
            .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {e}")))?
            .to_string();

        let mut pages = HashMap::new();
        pages.insert(location.clone(), html.to_string());

        Ok(Self {
            state: Mutex::new(SiteState {
                location,
                pages,
                routing: Routing::default(),
                hints: RuntimeHints {
                    history_api: true,
                    framework_globals: false,
                },
                tree: DomTree::parse(html),
                generation: 0,
                scroll_y: 0,
                activations: Vec::new(),
            }),
        })
    }

    /// Register another reachable page.
    #[must_use]
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.pages.insert(page_key(url), html.to_string());
        self
    }

    #[must_use]
    pub fn with_routing(mut self, routing: Routing) -> Self {
        self.state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .routing = routing;
        self
    }

    #[must_use]
    pub fn with_runtime_hints(mut self, hints: RuntimeHints) -> Self {
        self.state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .hints = hints;
        self
    }

    /// Every event delivered so far, oldest first.
    pub fn activations(&self) -> Vec<Activation> {
        self.state().activations.clone()
    }

    /// Current scroll offset.
    pub fn scroll_position(&self) -> u64 {
        self.state().scroll_y
    }

    fn state(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SiteState {
    fn handle(&self, idx: usize) -> ElementHandle {
        ElementHandle::new((u64::from(self.generation) << 32) | idx as u64)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn resolve(&self, handle: ElementHandle) -> Result<usize> {
        let id = handle.id();
        let generation = (id >> 32) as u32;
        let idx = (id & 0xffff_ffff) as usize;
        if generation != self.generation
            || idx >= self.tree.len()
            || !self.tree.is_element(idx)
            || !self.tree.is_attached(idx)
        {
            return Err(BrowserError::StaleElement(id));
        }
        Ok(idx)
    }

    fn select(&self, selector: &str) -> Result<Vec<usize>> {
        self.tree.select(selector).map_err(BrowserError::InvalidSelector)
    }

    fn lookup(&self, url: &str) -> Option<&String> {
        self.pages
            .get(&page_key(url))
            .or_else(|| self.pages.get(&page_key(strip_fragment(url))))
    }

    fn load(&mut self, url: &str) {
        let html = self
            .lookup(url)
            .cloned()
            .unwrap_or_else(|| NOT_FOUND_HTML.to_string());
        tracing::debug!("Loading {} ({} bytes)", url, html.len());
        self.tree = DomTree::parse(&html);
        self.generation = self.generation.wrapping_add(1);
        self.location = url.to_string();
        self.scroll_y = 0;
    }

    /// Replace the `main` region and title with those of `html`.
    fn swap_main(&mut self, html: &str) -> bool {
        let incoming = DomTree::parse(html);
        let (Some(source_main), Some(current_main)) = (
            incoming.find_first(incoming.root(), "main"),
            self.tree.find_first(self.tree.root(), "main"),
        ) else {
            return false;
        };

        self.tree.detach_children(current_main);
        for child in incoming.children(source_main) {
            self.tree.import(&incoming, child, current_main);
        }

        if let (Some(source_title), Some(current_title)) = (
            incoming.find_first(incoming.root(), "title"),
            self.tree.find_first(self.tree.root(), "title"),
        ) {
            let title = incoming.text_content(source_title);
            self.tree.replace_text(current_title, title.trim());
        }
        true
    }

    fn client_route(&mut self, url: &str) {
        let html = self
            .lookup(url)
            .cloned()
            .unwrap_or_else(|| NOT_FOUND_HTML.to_string());
        if self.swap_main(&html) {
            self.location = url.to_string();
        } else {
            self.load(url);
        }
    }

    fn follow_link(&mut self, href: &str) {
        if href.is_empty() || href == "#" {
            return;
        }
        let target = resolve_url(&self.location, href);
        if href.starts_with('#') && self.pages.get(&page_key(&target)).is_none() {
            self.location = target;
            return;
        }
        match self.routing {
            Routing::ClientSide => self.client_route(&target),
            Routing::FullReload => self.load(&target),
        }
    }

    fn find_by_id(&self, id: &str) -> Option<usize> {
        self.tree
            .descendants(self.tree.root())
            .into_iter()
            .find(|n| self.tree.attr(*n, "id") == Some(id))
    }

    fn toggle_disclosure(&mut self, idx: usize) {
        let expanding = self.tree.attr(idx, "aria-expanded") != Some("true");
        self.tree
            .set_attr(idx, "aria-expanded", if expanding { "true" } else { "false" });

        let target = self
            .tree
            .attr(idx, "aria-controls")
            .map(str::to_string)
            .and_then(|id| self.find_by_id(&id))
            .or_else(|| self.tree.next_element_sibling(idx));

        if let Some(target) = target {
            if expanding {
                self.tree.reveal(target);
            } else {
                self.tree.set_attr(target, "hidden", "");
            }
        }
    }

    fn expand_collapsed(&mut self, idx: usize) {
        self.tree.remove_class(idx, "collapsed");
        if let Some(sibling) = self.tree.next_element_sibling(idx) {
            self.tree.reveal(sibling);
        }
        for child in self.tree.element_children(idx) {
            if matches!(self.tree.tag(child), Some("ul" | "ol")) {
                self.tree.reveal(child);
            }
        }
    }

    fn closest_inclusive(&self, idx: usize, accept: impl Fn(usize) -> bool) -> Option<usize> {
        let mut current = Some(idx);
        while let Some(node) = current {
            if accept(node) {
                return Some(node);
            }
            current = self.tree.parent(node);
        }
        None
    }

    fn perform_default(&mut self, idx: usize) {
        if self.tree.attr(idx, "aria-expanded").is_some() {
            self.toggle_disclosure(idx);
            return;
        }

        if self.tree.tag(idx) == Some("summary") {
            if let Some(details) = self.tree.parent(idx) {
                if self.tree.attr(details, "open").is_some() {
                    self.tree.remove_attr(details, "open");
                } else {
                    self.tree.set_attr(details, "open", "");
                }
            }
            return;
        }

        if self.tree.has_class(idx, "collapsed") {
            self.expand_collapsed(idx);
            return;
        }

        let anchor = self.closest_inclusive(idx, |n| {
            self.tree.tag(n) == Some("a") && self.tree.attr(n, "href").is_some()
        });
        if let Some(anchor) = anchor {
            let href = self.tree.attr(anchor, "href").unwrap_or_default().to_string();
            self.follow_link(&href);
        }
    }

    fn fire(&mut self, idx: usize, event: &str) {
        self.activations.push(Activation {
            tag: self.tree.tag(idx).unwrap_or_default().to_string(),
            text: self.tree.text_content(idx).trim().to_string(),
            event: event.to_string(),
        });

        let trigger = self
            .closest_inclusive(idx, |n| self.tree.attr(n, "data-activation").is_some())
            .and_then(|n| self.tree.attr(n, "data-activation"))
            .unwrap_or("click");
        if trigger != event {
            return;
        }
        self.perform_default(idx);
    }

    fn frame_content(&self, idx: usize) -> Option<FrameContent> {
        let src = self
            .tree
            .attr(idx, "src")
            .map(|src| resolve_url(&self.location, src));

        let html = match self.tree.attr(idx, "srcdoc") {
            Some(srcdoc) => Some(srcdoc.to_string()),
            None => src
                .as_deref()
                .filter(|src| same_origin(src, &self.location))
                .and_then(|src| self.lookup(src).cloned()),
        };

        match (html, src) {
            (Some(html), src) => {
                let frame = DomTree::parse(&html);
                let body = frame.find_first(frame.root(), "body")?;
                Some(FrameContent::Accessible {
                    src,
                    body: frame.snapshot(body),
                })
            }
            (None, Some(src)) => Some(FrameContent::Restricted { src }),
            (None, None) => None,
        }
    }
}

fn same_origin(a: &str, b: &str) -> bool {
    match (url::Url::parse(a), url::Url::parse(b)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}

#[async_trait::async_trait]
impl PageEnvironment for StaticSite {
    async fn location(&self) -> Result<String> {
        Ok(self.state().location.clone())
    }

    async fn set_location(&self, url: &str, notice: LocationNotice) -> Result<()> {
        let mut state = self.state();
        let target = resolve_url(&state.location, url);
        match notice {
            LocationNotice::Silent => state.location = target,
            LocationNotice::PopState | LocationNotice::HashChange => {
                let routed = state.routing == Routing::ClientSide
                    && state.lookup(&target).cloned().is_some_and(|html| state.swap_main(&html));
                if !routed {
                    tracing::debug!("No listener handled location change to {}", target);
                }
                state.location = target;
            }
            LocationNotice::Load => state.load(&target),
        }
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        let state = self.state();
        let found = state.select(selector)?;
        Ok(found.into_iter().map(|idx| state.handle(idx)).collect())
    }

    async fn query_within(
        &self,
        scope: ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>> {
        let state = self.state();
        let scope = state.resolve(scope)?;
        let found = state.select(selector)?;
        Ok(found
            .into_iter()
            .filter(|idx| *idx != scope && state.tree.is_inclusive_ancestor(scope, *idx))
            .map(|idx| state.handle(idx))
            .collect())
    }

    async fn closest(
        &self,
        element: ElementHandle,
        selector: &str,
    ) -> Result<Option<ElementHandle>> {
        let state = self.state();
        let idx = state.resolve(element)?;
        let matches = state.select(selector)?;
        Ok(state
            .closest_inclusive(idx, |n| matches.contains(&n))
            .map(|n| state.handle(n)))
    }

    async fn contains(&self, outer: ElementHandle, inner: ElementHandle) -> Result<bool> {
        let state = self.state();
        let outer = state.resolve(outer)?;
        let inner = state.resolve(inner)?;
        Ok(state.tree.is_inclusive_ancestor(outer, inner))
    }

    async fn describe(&self, element: ElementHandle) -> Result<ElementInfo> {
        let state = self.state();
        let idx = state.resolve(element)?;
        Ok(ElementInfo {
            tag: state.tree.tag(idx).unwrap_or_default().to_string(),
            attrs: state.tree.attrs(idx),
            text: state.tree.text_content(idx).trim().to_string(),
        })
    }

    async fn inner_markup(&self, element: ElementHandle) -> Result<String> {
        let state = self.state();
        let idx = state.resolve(element)?;
        Ok(state.tree.inner_html(idx))
    }

    async fn ancestor_tags(&self, element: ElementHandle) -> Result<Vec<String>> {
        let state = self.state();
        let mut current = state.tree.parent(state.resolve(element)?);
        let mut tags = Vec::new();
        while let Some(node) = current {
            if let Some(tag) = state.tree.tag(node) {
                tags.push(tag.to_string());
            }
            current = state.tree.parent(node);
        }
        Ok(tags)
    }

    async fn is_visible(&self, element: ElementHandle) -> Result<bool> {
        let state = self.state();
        let idx = state.resolve(element)?;
        Ok(state.tree.is_visible(idx))
    }

    async fn scroll_into_view(&self, element: ElementHandle) -> Result<()> {
        let mut state = self.state();
        let idx = state.resolve(element)?;
        state.scroll_y = idx as u64 * LINE_HEIGHT;
        Ok(())
    }

    async fn activate(&self, element: ElementHandle) -> Result<()> {
        let mut state = self.state();
        let idx = state.resolve(element)?;
        state.fire(idx, "click");
        Ok(())
    }

    async fn dispatch_input(&self, element: ElementHandle, event: InputEvent) -> Result<()> {
        let mut state = self.state();
        let idx = state.resolve(element)?;
        state.fire(idx, event.event_type());
        Ok(())
    }

    async fn snapshot(&self, element: ElementHandle) -> Result<DomNode> {
        let state = self.state();
        let idx = state.resolve(element)?;
        Ok(state.tree.snapshot(idx))
    }

    async fn frames(&self) -> Result<Vec<FrameContent>> {
        let state = self.state();
        let frames = state.select("iframe")?;
        Ok(frames
            .into_iter()
            .filter_map(|idx| state.frame_content(idx))
            .collect())
    }

    async fn scroll_metrics(&self) -> Result<ScrollMetrics> {
        let state = self.state();
        let elements = state
            .tree
            .descendants(state.tree.root())
            .into_iter()
            .filter(|n| state.tree.is_element(*n))
            .count() as u64;
        Ok(ScrollMetrics {
            scroll_height: elements * LINE_HEIGHT,
            viewport_height: VIEWPORT_HEIGHT,
        })
    }

    async fn scroll_to(&self, y: u64) -> Result<()> {
        self.state().scroll_y = y;
        Ok(())
    }

    async fn runtime_hints(&self) -> Result<RuntimeHints> {
        Ok(self.state().hints)
    }
}
