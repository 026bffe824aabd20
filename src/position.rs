//! Line number reconstruction
//!
//! The arena carries no source offsets. An element's line is recovered by
//! replaying, in document order, everything that precedes it inside the root
//! element and counting the line breaks: character data, comments, processing
//! instructions, and the start tags of ancestors and earlier elements.

use crate::document::{Document, NodeId, NodeKind};
use crate::error::{ArtagsError, Result};
use crate::prolog::prolog_line_count;
use std::iter;

/// Content seen while walking towards a node.
enum Before<'a> {
    Text(&'a str),
    /// Line breaks inside a start tag.
    StartTag(usize),
}

/// All text (character data, comments, processing instructions) before `id`
/// inside the root element.
pub fn text_before(document: &Document, id: NodeId) -> Result<String> {
    let mut out = String::new();
    visit_before(document, id, |seen| {
        if let Before::Text(text) = seen {
            out.push_str(text);
        }
    })?;
    Ok(out)
}

/// 1-based line of `id`'s start tag, counting the root element's start tag as line 1.
pub fn line_number_within_body(document: &Document, id: NodeId) -> Result<usize> {
    let mut newlines = 0;
    visit_before(document, id, |seen| {
        newlines += match seen {
            Before::Text(text) => text.bytes().filter(|&b| b == b'\n').count(),
            Before::StartTag(lines) => lines,
        };
    })?;
    Ok(newlines + 1)
}

/// 1-based line of `id`'s start tag in the file, as an editor counts it.
pub fn absolute_line_number(document: &Document, id: NodeId, marker: Option<&str>) -> Result<usize> {
    Ok(prolog_line_count(document, marker)? + line_number_within_body(document, id)?)
}

fn visit_before<'a>(document: &'a Document, id: NodeId, mut visit: impl FnMut(Before<'a>)) -> Result<()> {
    let mut chain = vec![id];
    let mut current = id;
    while let Some(parent) = document.node(current)?.parent {
        if chain.len() > document.len() {
            return Err(ArtagsError::traversal(
                document.path(),
                format!("parent chain of node {} does not terminate", id),
            ));
        }
        chain.push(parent);
        current = parent;
    }

    for &level in chain.iter().rev() {
        for &sibling in document.preceding_siblings(level)? {
            for node in iter::once(sibling).chain(document.descendants(sibling)) {
                match &document.node(node)?.kind {
                    NodeKind::Text(text) | NodeKind::Comment(text) | NodeKind::Pi(text) => {
                        visit(Before::Text(text.as_str()))
                    }
                    NodeKind::Element(element) => visit(Before::StartTag(element.start_tag_lines)),
                }
            }
        }
        // An ancestor's start tag ends before its children begin.
        if level != id {
            if let NodeKind::Element(element) = &document.node(level)?.kind {
                visit(Before::StartTag(element.start_tag_lines));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element_line(source: &str, name: &str, nth: usize) -> usize {
        let doc = Document::parse("t.arxml", source).unwrap();
        let id = doc
            .descendants(Document::ROOT)
            .filter(|&id| doc.element(id).is_some_and(|e| e.name == name))
            .nth(nth)
            .unwrap();
        absolute_line_number(&doc, id, None).unwrap()
    }

    /// Line of the first source line containing `needle`, counted like an editor.
    fn line_of(source: &str, needle: &str) -> usize {
        source.lines().position(|l| l.contains(needle)).unwrap() + 1
    }

    const MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<AUTOSAR>
  <AR-PACKAGES>
    <AR-PACKAGE>
      <SHORT-NAME>Pkg</SHORT-NAME>
      <ELEMENTS>
        <!-- a comment
             spanning lines -->
        <INTERFACE>
          <SHORT-NAME>Interface</SHORT-NAME>
          <DESC>first
line
break</DESC>
          <DATA-TYPE>
            <SHORT-NAME>sint8</SHORT-NAME>
          </DATA-TYPE>
        </INTERFACE>
      </ELEMENTS>
    </AR-PACKAGE>
  </AR-PACKAGES>
</AUTOSAR>
"#;

    #[test]
    fn test_root_is_body_line_one() {
        let doc = Document::parse("t.arxml", MODEL).unwrap();
        assert_eq!(line_number_within_body(&doc, Document::ROOT).unwrap(), 1);
        assert_eq!(absolute_line_number(&doc, Document::ROOT, None).unwrap(), 2);
    }

    #[test]
    fn test_first_structural_child_matches_reader() {
        assert_eq!(element_line(MODEL, "AR-PACKAGES", 0), line_of(MODEL, "<AR-PACKAGES>"));
    }

    #[test]
    fn test_nested_lines_match_reader() {
        assert_eq!(element_line(MODEL, "AR-PACKAGE", 0), line_of(MODEL, "<AR-PACKAGE>"));
        assert_eq!(element_line(MODEL, "INTERFACE", 0), line_of(MODEL, "<INTERFACE>"));
        assert_eq!(element_line(MODEL, "DATA-TYPE", 0), line_of(MODEL, "<DATA-TYPE>"));
    }

    #[test]
    fn test_multiline_text_and_comments_counted() {
        assert_eq!(element_line(MODEL, "SHORT-NAME", 2), line_of(MODEL, ">sint8<"));
    }

    #[test]
    fn test_later_siblings_not_counted() {
        let source = "<A>\n<B/>\n<C>\n\n\n</C>\n</A>";
        assert_eq!(element_line(source, "B", 0), 2);
        assert_eq!(element_line(source, "C", 0), 3);
    }

    #[test]
    fn test_multiline_root_start_tag_counted() {
        let source = r#"<?xml version="1.0" encoding="UTF-8"?>
<AUTOSAR xmlns="http://autosar.org/schema/r4.0"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xsi:schemaLocation="http://autosar.org/schema/r4.0 AUTOSAR.xsd">
  <AR-PACKAGES>
    <AR-PACKAGE>
      <SHORT-NAME>Pkg</SHORT-NAME>
    </AR-PACKAGE>
  </AR-PACKAGES>
</AUTOSAR>
"#;
        assert_eq!(element_line(source, "AR-PACKAGES", 0), line_of(source, "<AR-PACKAGES>"));
        assert_eq!(element_line(source, "SHORT-NAME", 0), line_of(source, ">Pkg<"));
    }

    #[test]
    fn test_processing_instructions_counted() {
        let source = r#"<AUTOSAR>
  <?generator name="arxml-gen"
      version="4.2"
      date="2024-01-01"?>
  <AR-PACKAGES>
    <AR-PACKAGE/>
  </AR-PACKAGES>
</AUTOSAR>"#;
        assert_eq!(element_line(source, "AR-PACKAGES", 0), line_of(source, "<AR-PACKAGES>"));
        assert_eq!(element_line(source, "AR-PACKAGE", 0), line_of(source, "<AR-PACKAGE/>"));
    }

    #[test]
    fn test_multiline_sibling_start_tags_counted() {
        let source = r#"<AUTOSAR>
  <ELEMENT UUID="e-1"
      T="a">
    <SHORT-NAME>first</SHORT-NAME>
  </ELEMENT>
  <EMPTY
      T="b"/>
  <ELEMENT UUID="e-2">
    <SHORT-NAME>second</SHORT-NAME>
  </ELEMENT>
</AUTOSAR>"#;
        assert_eq!(element_line(source, "SHORT-NAME", 0), line_of(source, ">first<"));
        assert_eq!(element_line(source, "ELEMENT", 1), line_of(source, "\"e-2\""));
        assert_eq!(element_line(source, "SHORT-NAME", 1), line_of(source, ">second<"));
    }

    #[test]
    fn test_text_before() {
        let doc = Document::parse("t.arxml", "<A>x<B>y</B><C/>z</A>").unwrap();
        let c = doc
            .descendants(Document::ROOT)
            .find(|&id| doc.element(id).is_some_and(|e| e.name == "C"))
            .unwrap();
        assert_eq!(text_before(&doc, c).unwrap(), "xy");
    }
}
