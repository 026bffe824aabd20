//! Hierarchy-path resolution
//!
//! A reference such as `/Pkg/Interface/sint8` names a chain of named
//! ancestors ending in the target. Named elements are those with a name
//! child (`SHORT-NAME` in AUTOSAR). Unnamed wrapper elements may sit anywhere
//! between the named ones, so a reference is matched as a chain of
//! descendant constraints rather than as a literal path.

use crate::document::{Document, NodeId, NodeKind};
use crate::error::{ArtagsError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::iter;

/// Where the first segment of an absolute reference may match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    /// Any named element in the document.
    #[default]
    Anywhere,
    /// Only named elements without a named ancestor.
    Root,
}

/// Vocabulary of the model format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Child element holding an element's own name.
    pub name_element: String,
    /// Attribute marking an element whose text is a reference.
    pub reference_attribute: String,
    pub anchor: Anchor,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            name_element: "SHORT-NAME".to_string(),
            reference_attribute: "DEST".to_string(),
            anchor: Anchor::Anywhere,
        }
    }
}

/// An element located somewhere in a corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target {
    /// Index of the document in the corpus slice.
    pub document: usize,
    pub node: NodeId,
}

/// Elements carrying the reference attribute, in document order.
pub fn find_reference_elements(document: &Document, options: &ResolverOptions) -> Vec<NodeId> {
    iter::once(Document::ROOT)
        .chain(document.descendants(Document::ROOT))
        .filter(|&id| {
            document
                .element(id)
                .is_some_and(|e| e.attribute(&options.reference_attribute).is_some())
        })
        .collect()
}

/// Text of a reference element, surrounding whitespace removed.
pub fn reference_text(document: &Document, id: NodeId) -> String {
    document.text_content(id).trim().to_string()
}

/// Name constraints of a reference: the leading empty segment and any
/// trailing empty segments are dropped.
pub fn reference_segments(reference: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = reference.trim().split('/').collect();
    if segments.first() == Some(&"") {
        segments.remove(0);
    }
    while segments.last() == Some(&"") {
        segments.pop();
    }
    segments
}

/// The referenced symbol: the last non-empty segment.
pub fn symbol_of(reference: &str) -> &str {
    reference_segments(reference).last().copied().unwrap_or_default()
}

/// Every element in `corpus` designated by `reference`.
///
/// Results are ordered by document then node and contain no duplicates. An
/// empty result means the reference dangles.
pub fn resolve_reference(
    reference: &str,
    corpus: &[Document],
    options: &ResolverOptions,
) -> Vec<Target> {
    corpus
        .iter()
        .enumerate()
        .flat_map(|(index, document)| {
            resolve_in_document(reference, document, options)
                .into_iter()
                .map(move |node| Target {
                    document: index,
                    node,
                })
        })
        .collect()
}

/// Matches of `reference` inside one document, in document order.
pub fn resolve_in_document(
    reference: &str,
    document: &Document,
    options: &ResolverOptions,
) -> Vec<NodeId> {
    let segments = reference_segments(reference);
    if segments.is_empty() || document.is_empty() {
        return Vec::new();
    }

    let anchored = options.anchor == Anchor::Root && reference.trim_start().starts_with('/');

    let mut found = Vec::new();
    // The root element itself may carry a name.
    let root_name = name_of(document, Document::ROOT, &options.name_element);
    if root_name.as_deref() == Some(segments[0]) {
        continue_chain(document, Document::ROOT, &segments, options, &mut found);
    }
    if !(anchored && root_name.is_some()) {
        descend(document, Document::ROOT, &segments, anchored, options, &mut found);
    }

    found.sort_unstable();
    found.dedup();
    found
}

/// `id` satisfied `segments[0]`; match the rest below it.
fn continue_chain(
    document: &Document,
    id: NodeId,
    segments: &[&str],
    options: &ResolverOptions,
    found: &mut Vec<NodeId>,
) {
    let rest = &segments[1..];
    if rest.is_empty() {
        found.push(id);
    } else {
        descend(document, id, rest, false, options, found);
    }
}

/// Search below `from` for elements named `segments[0]`.
///
/// With `top_level` set only elements without a named ancestor qualify, so
/// the walk does not enter named elements.
fn descend(
    document: &Document,
    from: NodeId,
    segments: &[&str],
    top_level: bool,
    options: &ResolverOptions,
    found: &mut Vec<NodeId>,
) {
    let Some(first) = segments.first() else {
        return;
    };

    let mut stack: Vec<NodeId> = document.children(from).iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        if !document.get(id).is_some_and(|n| n.is_element()) {
            continue;
        }

        let name = name_of(document, id, &options.name_element);
        if name.as_deref() == Some(*first) {
            continue_chain(document, id, segments, options, found);
        }

        if top_level && name.is_some() {
            continue;
        }
        stack.extend(document.children(id).iter().rev().copied());
    }
}

/// Own name of an element, or an empty string.
pub fn own_name(document: &Document, id: NodeId, options: &ResolverOptions) -> String {
    name_of(document, id, &options.name_element)
        .map(Cow::into_owned)
        .unwrap_or_default()
}

/// Names of `id`'s named ancestors, outermost first, as `/A/B`.
///
/// `id`'s own name is not included. Unnamed ancestors are skipped.
pub fn compute_own_hierarchy_path(
    document: &Document,
    id: NodeId,
    options: &ResolverOptions,
) -> Result<String> {
    let mut names = Vec::new();
    let mut current = document.node(id)?.parent;
    let mut steps = 0;
    while let Some(ancestor) = current {
        steps += 1;
        if steps > document.len() {
            return Err(ArtagsError::traversal(
                document.path(),
                format!("ancestor chain of node {} does not terminate", id),
            ));
        }
        if let Some(name) = name_of(document, ancestor, &options.name_element) {
            names.push(name);
        }
        current = document.node(ancestor)?.parent;
    }

    if names.is_empty() {
        return Ok(String::new());
    }
    names.reverse();
    Ok(format!("/{}", names.join("/")))
}

/// Hierarchy path of `id` including its own name.
pub fn canonical_path(document: &Document, id: NodeId, options: &ResolverOptions) -> Result<String> {
    let mut path = compute_own_hierarchy_path(document, id, options)?;
    if let Some(name) = name_of(document, id, &options.name_element) {
        path.push('/');
        path.push_str(&name);
    }
    Ok(path)
}

/// Trimmed text of the first `name_element` child; `None` when absent or blank.
fn name_of<'a>(document: &'a Document, id: NodeId, name_element: &str) -> Option<Cow<'a, str>> {
    let holder = document
        .element_children(id)
        .find(|&child| document.element(child).is_some_and(|e| e.name == name_element))?;

    let name = match document.children(holder) {
        [only] => match document.get(*only).map(|n| &n.kind) {
            Some(NodeKind::Text(text)) => Cow::Borrowed(text.trim()),
            _ => Cow::Owned(document.text_content(holder).trim().to_string()),
        },
        _ => Cow::Owned(document.text_content(holder).trim().to_string()),
    };

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
