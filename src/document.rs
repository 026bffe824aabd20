//! Document loading into an index-addressed element arena
//!
//! roxmltree borrows its input, so each parsed file is copied into an owned
//! arena: every node holds its parent index and the ordered list of its child
//! indices. Only the root element's subtree is kept; the prolog is recovered
//! separately from the raw text (see [`crate::prolog`]).

use crate::charset::Charset;
use crate::error::{ArtagsError, Result};
use roxmltree::ParsingOptions;
use std::fs;
use std::path::{Path, PathBuf};

/// Index of a node inside its document's arena.
pub type NodeId = usize;

/// An element's tag and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Local tag name (namespace stripped), used for matching.
    pub name: String,
    /// Tag name as written in the source, including any prefix.
    pub qname: String,
    /// Attributes in source order, keyed by name as written (`xsi:type`).
    pub attributes: Vec<(String, String)>,
    /// Line breaks inside the start tag, between its attributes.
    pub start_tag_lines: usize,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    Comment(String),
    /// Processing instruction text between `<?` and `?>`.
    Pi(String),
}

/// One arena slot.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element(_))
    }
}

/// A parsed model file.
#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    source: String,
    charset: Charset,
    nodes: Vec<Node>,
}

impl Document {
    /// Root element id. The arena always starts with the root element.
    pub const ROOT: NodeId = 0;

    /// Read, decode and parse a file.
    ///
    /// `fallback` is used when the file has neither a BOM nor an encoding
    /// declaration.
    pub fn load(path: &Path, fallback: Charset) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| ArtagsError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let (charset, skip) = Charset::detect(&bytes, fallback)?;
        let source = charset
            .decode(&bytes[skip..])
            .ok_or_else(|| ArtagsError::Decode {
                path: path.to_path_buf(),
                charset: charset.name().to_string(),
            })?;

        Self::from_source(path, source, charset)
    }

    /// Parse already-decoded text.
    pub fn parse(path: impl Into<PathBuf>, source: impl Into<String>) -> Result<Self> {
        Self::from_source(&path.into(), source.into(), Charset::utf8())
    }

    fn from_source(path: &Path, source: String, charset: Charset) -> Result<Self> {
        let mut options = ParsingOptions::default();
        options.allow_dtd = true;
        let xml = roxmltree::Document::parse_with_options(&source, options).map_err(|e| {
            ArtagsError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        let mut nodes = Vec::new();
        copy_subtree(&mut nodes, &source, xml.root_element(), None);
        drop(xml);

        Ok(Self {
            path: path.to_path_buf(),
            source,
            charset,
            nodes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decoded file text, prolog included.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Like [`Document::get`], but a missing id is a traversal error.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| ArtagsError::traversal(&self.path, format!("node {} out of range", id)))
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.get(id).and_then(Node::as_element)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    /// Child ids that are elements, in document order.
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.get(child).is_some_and(Node::is_element))
    }

    /// Siblings that occur before `id` under the same parent, in document order.
    pub fn preceding_siblings(&self, id: NodeId) -> Result<&[NodeId]> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(&[]);
        };
        let siblings = &self.node(parent)?.children;
        let position = siblings.iter().position(|&s| s == id).ok_or_else(|| {
            ArtagsError::traversal(
                &self.path,
                format!("node {} is not listed under its parent {}", id, parent),
            )
        })?;
        Ok(&siblings[..position])
    }

    /// All nodes below `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Concatenated text of all text nodes below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(NodeKind::Text(text)) = self.get(id).map(|n| &n.kind) {
            out.push_str(text);
        }
        for node in self.descendants(id) {
            if let Some(NodeKind::Text(text)) = self.get(node).map(|n| &n.kind) {
                out.push_str(text);
            }
        }
        out
    }

    /// Opening text of the root element's start tag, e.g. `<AUTOSAR`.
    pub fn root_marker(&self) -> Option<String> {
        self.element(Self::ROOT).map(|e| format!("<{}", e.qname))
    }
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}

fn copy_subtree(
    nodes: &mut Vec<Node>,
    source: &str,
    xml: roxmltree::Node,
    parent: Option<NodeId>,
) -> Option<NodeId> {
    let kind = if xml.is_element() {
        NodeKind::Element(Element {
            name: xml.tag_name().name().to_string(),
            qname: qualified_name(xml),
            attributes: xml
                .attributes()
                .map(|a| (qualified_attribute_name(xml, &a), a.value().to_string()))
                .collect(),
            start_tag_lines: start_tag_lines(source, xml),
        })
    } else if xml.is_text() {
        NodeKind::Text(xml.text().unwrap_or_default().to_string())
    } else if xml.is_comment() {
        NodeKind::Comment(xml.text().unwrap_or_default().to_string())
    } else if xml.is_pi() {
        let range = xml.range();
        let raw = source.get(range.start + 2..range.end.saturating_sub(2));
        NodeKind::Pi(raw.unwrap_or_default().to_string())
    } else {
        return None;
    };

    let id = nodes.len();
    nodes.push(Node {
        kind,
        parent,
        children: Vec::new(),
    });

    for child in xml.children() {
        if let Some(child_id) = copy_subtree(nodes, source, child, Some(id)) {
            nodes[id].children.push(child_id);
        }
    }

    Some(id)
}

fn qualified_name(xml: roxmltree::Node) -> String {
    let tag = xml.tag_name();
    match tag
        .namespace()
        .and_then(|ns| xml.lookup_prefix(ns))
        .filter(|prefix| !prefix.is_empty())
    {
        Some(prefix) => format!("{}:{}", prefix, tag.name()),
        None => tag.name().to_string(),
    }
}

fn qualified_attribute_name(xml: roxmltree::Node, attribute: &roxmltree::Attribute) -> String {
    match attribute
        .namespace()
        .and_then(|ns| xml.lookup_prefix(ns))
        .filter(|prefix| !prefix.is_empty())
    {
        Some(prefix) => format!("{}:{}", prefix, attribute.name()),
        None => attribute.name().to_string(),
    }
}

/// Newlines from `<` to the end of the start tag. A childless element
/// counts its whole span.
fn start_tag_lines(source: &str, xml: roxmltree::Node) -> usize {
    let range = xml.range();
    let end = xml.first_child().map_or(range.end, |child| child.range().start);
    source
        .get(range.start..end)
        .map_or(0, |tag| tag.bytes().filter(|&b| b == b'\n').count())
}
