//! Search-pattern locators
//!
//! Instead of a line number, a tag can locate its element with an editor
//! search pattern built from the element's XML. Whitespace between tags is
//! matched lazily with `\_s\{-\}`, so the pattern survives re-indentation.

use crate::document::{Document, NodeId, NodeKind};

/// Default number of serialised characters a pattern is built from.
pub const DEFAULT_PATTERN_LIMIT: usize = 256;

/// Lazy any-whitespace atom (matches across line breaks).
const GAP: &str = r"\_s\{-\}";

/// Build `/…/` for the element `id`, starting at the first occurrence of `symbol`.
pub fn search_pattern(document: &Document, id: NodeId, symbol: &str, limit: usize) -> String {
    let mut xml = String::new();
    serialize(document, id, &mut xml);
    let head: String = xml.chars().take(limit).collect();

    let joined = complete_pieces(&head)
        .into_iter()
        .map(escape)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(GAP);

    let needle = escape(symbol);
    let body = match joined.find(&needle) {
        Some(start) if !needle.is_empty() => &joined[start..],
        _ => joined.as_str(),
    };

    format!("/{}/", body)
}

/// Split into tags and text runs, dropping whatever follows the last complete tag.
fn complete_pieces(xml: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = xml;
    while !rest.is_empty() {
        if rest.starts_with('<') {
            let Some(end) = rest.find('>') else {
                break;
            };
            pieces.push(&rest[..=end]);
            rest = &rest[end + 1..];
        } else {
            let Some(end) = rest.find('<') else {
                break;
            };
            pieces.push(&rest[..end]);
            rest = &rest[end..];
        }
    }
    pieces
}

fn escape(piece: &str) -> String {
    let mut out = String::with_capacity(piece.len());
    for ch in piece.trim().chars() {
        match ch {
            '\t' | '\r' | '\n' => {}
            '\\' | '/' | '*' | '[' | '~' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Write `id` and its subtree as compact XML.
pub fn serialize(document: &Document, id: NodeId, out: &mut String) {
    let Some(node) = document.get(id) else {
        return;
    };

    match &node.kind {
        NodeKind::Text(text) => push_escaped(out, text, false),
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Pi(text) => {
            out.push_str("<?");
            out.push_str(text);
            out.push_str("?>");
        }
        NodeKind::Element(element) => {
            out.push('<');
            out.push_str(&element.qname);
            for (key, value) in &element.attributes {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                push_escaped(out, value, true);
                out.push('"');
            }
            if node.children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for &child in &node.children {
                serialize(document, child, out);
            }
            out.push_str("</");
            out.push_str(&element.qname);
            out.push('>');
        }
    }
}

fn push_escaped(out: &mut String, text: &str, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}
