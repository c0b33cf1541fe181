//! Owned, mutable DOM arena for the in-memory environment.
//!
//! `scraper::Html` is not `Send`, so pages are parsed into this arena and only
//! re-parsed transiently (inside a single synchronous call) for selector
//! matching. Every element is stamped with its arena index while serialized so
//! matches can be mapped back.

use crate::dom::{DomElement, DomNode};
use scraper::{Html, Selector};
use std::collections::BTreeMap;

const NODE_ATTR: &str = "data-sitescribe-node";

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const NON_RENDERED_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "title", "meta", "link",
];

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct TreeNode {
    parent: Option<usize>,
    children: Vec<usize>,
    data: NodeData,
}

#[derive(Debug, Clone)]
pub(crate) struct DomTree {
    nodes: Vec<TreeNode>,
    root: usize,
}

impl DomTree {
    /// Parse a full HTML document; the arena root is the `html` element.
    pub(crate) fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut tree = Self {
            nodes: Vec::new(),
            root: 0,
        };
        // (depth, arena index) of the open ancestors; descendants() is pre-order.
        let mut open: Vec<(usize, usize)> = Vec::new();

        for node in document.root_element().descendants() {
            let data = match node.value() {
                scraper::Node::Element(element) => NodeData::Element {
                    tag: element.name().to_ascii_lowercase(),
                    attrs: element
                        .attrs()
                        .map(|(name, value)| (name.to_string(), value.to_string()))
                        .collect(),
                },
                scraper::Node::Text(text) => {
                    let text: &str = text;
                    NodeData::Text(text.to_string())
                }
                _ => continue,
            };
            let depth = node.ancestors().count();
            while open.last().is_some_and(|(d, _)| *d >= depth) {
                open.pop();
            }
            let parent = open.last().map(|(_, idx)| *idx);
            let idx = tree.push(parent, data);
            open.push((depth, idx));
        }

        tree
    }

    fn push(&mut self, parent: Option<usize>, data: NodeData) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(TreeNode {
            parent,
            children: Vec::new(),
            data,
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(idx);
        }
        idx
    }

    pub(crate) fn root(&self) -> usize {
        self.root
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether `idx` is still reachable from the root.
    pub(crate) fn is_attached(&self, idx: usize) -> bool {
        let mut current = Some(idx);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.nodes.get(node).and_then(|n| n.parent);
        }
        false
    }

    pub(crate) fn is_element(&self, idx: usize) -> bool {
        matches!(self.nodes[idx].data, NodeData::Element { .. })
    }

    pub(crate) fn tag(&self, idx: usize) -> Option<&str> {
        match &self.nodes[idx].data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub(crate) fn parent(&self, idx: usize) -> Option<usize> {
        self.nodes[idx].parent
    }

    pub(crate) fn attr(&self, idx: usize, name: &str) -> Option<&str> {
        match &self.nodes[idx].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub(crate) fn attrs(&self, idx: usize) -> BTreeMap<String, String> {
        match &self.nodes[idx].data {
            NodeData::Element { attrs, .. } => attrs.iter().cloned().collect(),
            NodeData::Text(_) => BTreeMap::new(),
        }
    }

    pub(crate) fn set_attr(&mut self, idx: usize, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[idx].data {
            match attrs.iter_mut().find(|(n, _)| n == name) {
                Some(entry) => entry.1 = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub(crate) fn remove_attr(&mut self, idx: usize, name: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[idx].data {
            attrs.retain(|(n, _)| n != name);
        }
    }

    pub(crate) fn has_class(&self, idx: usize, class: &str) -> bool {
        self.attr(idx, "class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    pub(crate) fn remove_class(&mut self, idx: usize, class: &str) {
        if let Some(current) = self.attr(idx, "class") {
            let kept: Vec<&str> = current.split_whitespace().filter(|c| *c != class).collect();
            let kept = kept.join(" ");
            self.set_attr(idx, "class", &kept);
        }
    }

    /// All children of `idx`, text included.
    pub(crate) fn children(&self, idx: usize) -> Vec<usize> {
        self.nodes[idx].children.clone()
    }

    /// Element children of `idx`.
    pub(crate) fn element_children(&self, idx: usize) -> Vec<usize> {
        self.nodes[idx]
            .children
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    /// Next element sibling.
    pub(crate) fn next_element_sibling(&self, idx: usize) -> Option<usize> {
        let parent = self.nodes[idx].parent?;
        let siblings = &self.nodes[parent].children;
        let pos = siblings.iter().position(|s| *s == idx)?;
        siblings[pos + 1..]
            .iter()
            .copied()
            .find(|s| self.is_element(*s))
    }

    /// Pre-order descendants of `idx`, excluding `idx`.
    pub(crate) fn descendants(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[idx].children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.nodes[node].children.iter().rev().copied());
        }
        out
    }

    /// First element with `tag` in document order, searching from `idx` inclusive.
    pub(crate) fn find_first(&self, idx: usize, tag: &str) -> Option<usize> {
        std::iter::once(idx)
            .chain(self.descendants(idx))
            .find(|n| self.tag(*n) == Some(tag))
    }

    pub(crate) fn is_inclusive_ancestor(&self, ancestor: usize, node: usize) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.nodes[n].parent;
        }
        false
    }

    pub(crate) fn text_content(&self, idx: usize) -> String {
        match &self.nodes[idx].data {
            NodeData::Text(text) => text.clone(),
            NodeData::Element { .. } => self
                .descendants(idx)
                .into_iter()
                .filter_map(|n| match &self.nodes[n].data {
                    NodeData::Text(text) => Some(text.as_str()),
                    NodeData::Element { .. } => None,
                })
                .collect(),
        }
    }

    pub(crate) fn replace_text(&mut self, idx: usize, text: &str) {
        for child in std::mem::take(&mut self.nodes[idx].children) {
            self.nodes[child].parent = None;
        }
        self.push(Some(idx), NodeData::Text(text.to_string()));
    }

    /// Detach every child of `idx`; detached nodes stay in the arena as stale entries.
    pub(crate) fn detach_children(&mut self, idx: usize) {
        for child in std::mem::take(&mut self.nodes[idx].children) {
            self.nodes[child].parent = None;
        }
    }

    /// Deep-copy `source_idx` of `source` under `parent`.
    pub(crate) fn import(&mut self, source: &DomTree, source_idx: usize, parent: usize) -> usize {
        let idx = self.push(Some(parent), source.nodes[source_idx].data.clone());
        for child in &source.nodes[source_idx].children {
            self.import(source, *child, idx);
        }
        idx
    }

    /// Whether the element itself is displayed, ignoring ancestors.
    pub(crate) fn own_visible(&self, idx: usize) -> bool {
        let Some(tag) = self.tag(idx) else {
            return true;
        };
        if NON_RENDERED_TAGS.contains(&tag) || self.attr(idx, "hidden").is_some() {
            return false;
        }
        if let Some(style) = self.attr(idx, "style") {
            let style: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            if style.contains("display:none") || style.contains("visibility:hidden") {
                return false;
            }
        }
        if tag != "summary" {
            if let Some(parent) = self.parent(idx) {
                if self.tag(parent) == Some("details") && self.attr(parent, "open").is_none() {
                    return false;
                }
            }
        }
        true
    }

    /// Visibility of the element and all of its ancestors.
    pub(crate) fn is_visible(&self, idx: usize) -> bool {
        let mut current = Some(idx);
        while let Some(node) = current {
            if !self.own_visible(node) {
                return false;
            }
            current = self.nodes[node].parent;
        }
        true
    }

    /// Remove whatever hides the element itself.
    pub(crate) fn reveal(&mut self, idx: usize) {
        self.remove_attr(idx, "hidden");
        if let Some(style) = self.attr(idx, "style") {
            let cleaned: Vec<&str> = style
                .split(';')
                .filter(|decl| {
                    let compact: String = decl.chars().filter(|c| !c.is_whitespace()).collect();
                    compact != "display:none" && compact != "visibility:hidden"
                })
                .collect();
            let cleaned = cleaned.join(";");
            self.set_attr(idx, "style", &cleaned);
        }
    }

    pub(crate) fn snapshot(&self, idx: usize) -> DomNode {
        match &self.nodes[idx].data {
            NodeData::Text(text) => DomNode::text(text.clone()),
            NodeData::Element { tag, attrs } => DomNode::Element(DomElement {
                tag: tag.clone(),
                attrs: attrs.iter().cloned().collect(),
                visible: self.own_visible(idx),
                children: self.nodes[idx]
                    .children
                    .iter()
                    .map(|c| self.snapshot(*c))
                    .collect(),
            }),
        }
    }

    pub(crate) fn inner_html(&self, idx: usize) -> String {
        let mut out = String::new();
        for child in &self.nodes[idx].children {
            self.write_html(*child, false, &mut out);
        }
        out
    }

    fn write_html(&self, idx: usize, stamp: bool, out: &mut String) {
        match &self.nodes[idx].data {
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                if stamp {
                    out.push_str(&format!(" {NODE_ATTR}=\"{idx}\""));
                }
                out.push('>');
                if VOID_TAGS.contains(&tag.as_str()) {
                    return;
                }
                for child in &self.nodes[idx].children {
                    self.write_html(*child, stamp, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    /// Arena indices of elements matching `selector`, in document order.
    pub(crate) fn select(&self, selector: &str) -> Result<Vec<usize>, String> {
        let parsed = Selector::parse(selector).map_err(|e| format!("{selector}: {e:?}"))?;
        let mut html = String::new();
        self.write_html(self.root, true, &mut html);
        let document = Html::parse_document(&html);
        let found = document
            .select(&parsed)
            .filter_map(|element| element.value().attr(NODE_ATTR))
            .filter_map(|value| value.parse::<usize>().ok())
            .collect();
        Ok(found)
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
