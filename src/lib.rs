//! AUTOSAR model tags library
//!
//! Indexes a corpus of ARXML files and resolves every `DEST` reference
//! (`/Pkg/Interface/sint8`) to the element it names, in any file, producing
//! ctags-style records an editor can jump to.
//!
//! # Example
//!
//! ```
//! use artags::{build_index, Corpus, Document, IndexOptions, Locator};
//!
//! let source = r#"<AUTOSAR>
//!   <P>
//!     <SHORT-NAME>Pkg</SHORT-NAME>
//!     <X><SHORT-NAME>x</SHORT-NAME></X>
//!     <R DEST="X">/Pkg/x</R>
//!   </P>
//! </AUTOSAR>"#;
//!
//! let corpus = Corpus::new(vec![Document::parse("model.arxml", source).unwrap()]);
//! let result = build_index(&corpus, &IndexOptions::default()).unwrap();
//!
//! let record = result.records.iter().next().unwrap();
//! assert_eq!(record.symbol, "x");
//! assert_eq!(record.locator, Locator::Line(4));
//! ```

mod charset;
mod config;
mod document;
mod error;
mod indexer;
mod pattern;
mod position;
mod prolog;
mod record;
mod resolver;
mod walker;
mod writer;

pub use charset::Charset;
pub use config::{ArtagsConfig, CliOverrides, ConfigError, CONFIG_NAMES};
pub use document::{Descendants, Document, Element, Node, NodeId, NodeKind};
pub use error::{ArtagsError, Result};
pub use indexer::{build_index, Corpus, IndexOptions, IndexResult, IndexStats, LocatorMode};
pub use pattern::{search_pattern, serialize, DEFAULT_PATTERN_LIMIT};
pub use position::{absolute_line_number, line_number_within_body, text_before};
pub use prolog::{count_lines_before, prolog_line_count};
pub use record::{Locator, Record};
pub use resolver::{
    canonical_path, compute_own_hierarchy_path, find_reference_elements, own_name,
    reference_segments, reference_text, resolve_in_document, resolve_reference, symbol_of, Anchor,
    ResolverOptions, Target,
};
pub use walker::discover;
pub use writer::{TagWriter, WriteMode};
