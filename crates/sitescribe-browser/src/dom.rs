//! Serializable snapshot of a DOM subtree.
//!
//! Both environments hand subtrees to the extractor in this shape, so text
//! rendering never has to reach back into a live page.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One node of a captured subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DomNode {
    /// Character data
    Text {
        /// Raw text, untrimmed
        text: String,
    },
    /// Element with its computed visibility
    Element(DomElement),
}

/// Element node of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomElement {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes, minus any bookkeeping attributes the environment adds
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    /// False when the element is not displayed or is visibility-hidden
    pub visible: bool,
    /// Child nodes in document order
    #[serde(default)]
    pub children: Vec<DomNode>,
}

impl DomElement {
    /// Attribute value by name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

impl DomNode {
    /// Convenience constructor for text nodes.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Convenience constructor for a visible element without attributes.
    pub fn element(tag: impl Into<String>, children: Vec<DomNode>) -> Self {
        Self::Element(DomElement {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            visible: true,
            children,
        })
    }

    /// Concatenated descendant text, like `textContent`.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text { text } => out.push_str(text),
            Self::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_includes_hidden_children() {
        let mut hidden = DomElement {
            tag: "span".to_string(),
            attrs: BTreeMap::new(),
            visible: false,
            children: vec![DomNode::text("secret")],
        };
        hidden.attrs.insert("class".to_string(), "x".to_string());
        let root = DomNode::element(
            "div",
            vec![DomNode::text("shown "), DomNode::Element(hidden)],
        );
        assert_eq!(root.text_content(), "shown secret");
    }

    #[test]
    fn test_snapshot_wire_format() {
        let json = r#"{"kind":"element","tag":"p","visible":true,"children":[{"kind":"text","text":"hi"}]}"#;
        let node: DomNode = serde_json::from_str(json).expect("parse snapshot");
        assert_eq!(node.text_content(), "hi");
    }
}
