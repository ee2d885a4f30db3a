//! In-memory document tree handed over by an external XML reader.
//!
//! The crate never touches raw XML: modeling-tool exports are deserialized
//! elsewhere and arrive as this tree (JSON-encoded at the CLI and WASM
//! boundaries). The dialect walkers in `xmi/` only navigate it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// First child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Text of the first child with the given tag, if any.
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.child(tag).and_then(|c| c.text.as_deref())
    }

    /// The `xmi:type` (or `xsi:type`) discriminator XMI tools attach to
    /// polymorphic elements.
    pub fn xmi_type(&self) -> Option<&str> {
        self.attr("xmi:type").or_else(|| self.attr("xsi:type"))
    }

    /// The element's `xmi:id`, the opaque string id the source document uses
    /// for cross-references.
    pub fn xmi_id(&self) -> Option<&str> {
        self.attr("xmi:id")
    }
}
