//! Raw-text prolog scanner
//!
//! Parsed trees drop everything before the root element, so the number of
//! lines in the prolog is recovered from the decoded file text.
//!
//! The scan matches the marker text literally. A marker that also appears in
//! a prolog comment or declaration stops the scan early and shifts every
//! position in the file.

use crate::document::Document;
use crate::error::{ArtagsError, Result};

/// Count the lines before the one containing the root marker.
///
/// `marker` overrides the marker derived from the root element (`<` plus its
/// qualified name).
pub fn prolog_line_count(document: &Document, marker: Option<&str>) -> Result<usize> {
    let marker = match marker {
        Some(m) => m.to_string(),
        None => document.root_marker().ok_or_else(|| {
            ArtagsError::traversal(document.path(), "document has no root element")
        })?,
    };

    count_lines_before(document.source(), &marker).ok_or_else(|| {
        ArtagsError::RootMarkerNotFound {
            path: document.path().to_path_buf(),
            marker,
        }
    })
}

/// Lines of `source` preceding the first line that contains `marker`.
pub fn count_lines_before(source: &str, marker: &str) -> Option<usize> {
    source.lines().position(|line| line.contains(marker))
}
