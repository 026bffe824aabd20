//! Corpus loading and index construction

use crate::charset::Charset;
use crate::document::{Document, NodeId};
use crate::error::{ArtagsError, Result};
use crate::pattern::{search_pattern, DEFAULT_PATTERN_LIMIT};
use crate::position::line_number_within_body;
use crate::prolog::prolog_line_count;
use crate::record::{Locator, Record};
use crate::resolver::{
    canonical_path, find_reference_elements, reference_text, resolve_reference, symbol_of,
    ResolverOptions, Target,
};
use log::{debug, info, log_enabled, trace, warn, Level};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// How a record locates its definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocatorMode {
    #[default]
    Line,
    Pattern,
}

/// Options for loading and indexing a corpus.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub resolver: ResolverOptions,
    /// Prolog scan marker; derived from each document's root element when unset.
    pub root_marker: Option<String>,
    pub locator: LocatorMode,
    pub pattern_limit: usize,
    /// Worker threads; 0 uses the global rayon pool.
    pub jobs: usize,
    /// Charset for documents with neither BOM nor encoding declaration.
    /// Independent of the tags file charset.
    pub input_charset: Charset,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            resolver: ResolverOptions::default(),
            root_marker: None,
            locator: LocatorMode::Line,
            pattern_limit: DEFAULT_PATTERN_LIMIT,
            jobs: 0,
            input_charset: Charset::utf8(),
        }
    }
}

/// All documents of one indexing pass, resident in memory.
#[derive(Debug, Default)]
pub struct Corpus {
    documents: Vec<Document>,
    skipped: usize,
}

impl Corpus {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            skipped: 0,
        }
    }

    /// Load every path. Unreadable or malformed documents are logged and
    /// skipped; any other failure aborts the load.
    pub fn load(paths: &[PathBuf], options: &IndexOptions) -> Result<Self> {
        let mut corpus = Self::default();

        for path in paths {
            match Document::load(path, options.input_charset) {
                Ok(document) => {
                    debug!(
                        "Loaded {} ({} nodes, {})",
                        path.display(),
                        document.len(),
                        document.charset()
                    );
                    corpus.documents.push(document);
                }
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping {}: {}", path.display(), e);
                    corpus.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Loaded {} documents ({} skipped)",
            corpus.documents.len(),
            corpus.skipped
        );
        Ok(corpus)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Documents that failed to load.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Totals of one indexing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub skipped: usize,
    pub references: usize,
    /// References that matched nothing.
    pub dangling: usize,
    pub records: usize,
}

#[derive(Debug, Default)]
pub struct IndexResult {
    pub records: HashSet<Record>,
    pub stats: IndexStats,
}

impl IndexResult {
    /// Records in a stable order.
    pub fn sorted(&self) -> Vec<&Record> {
        let mut records: Vec<&Record> = self.records.iter().collect();
        records.sort();
        records
    }
}

/// Records found by one worker.
#[derive(Default)]
struct Partial {
    records: HashSet<Record>,
    dangling: usize,
}

impl Partial {
    fn merge(mut self, mut other: Partial) -> Partial {
        if self.records.len() < other.records.len() {
            std::mem::swap(&mut self.records, &mut other.records);
        }
        self.records.extend(other.records);
        self.dangling += other.dangling;
        self
    }
}

/// Resolve every reference of every document against the whole corpus.
///
/// References are independent, so they are spread over a rayon pool and the
/// per-worker record sets are unioned at the end. The first fatal error
/// stops the pass.
pub fn build_index(corpus: &Corpus, options: &IndexOptions) -> Result<IndexResult> {
    let references: Vec<(usize, NodeId)> = corpus
        .documents
        .iter()
        .enumerate()
        .flat_map(|(index, document)| {
            find_reference_elements(document, &options.resolver)
                .into_iter()
                .map(move |id| (index, id))
        })
        .collect();
    debug!("Found {} reference elements", references.len());

    // `None` re-raises the scan failure on first use.
    let prologs: Vec<Option<usize>> = match options.locator {
        LocatorMode::Line => corpus
            .documents
            .par_iter()
            .map(|document| prolog_line_count(document, options.root_marker.as_deref()).ok())
            .collect(),
        LocatorMode::Pattern => Vec::new(),
    };

    let run = || {
        references
            .par_iter()
            .map(|&(document, id)| index_reference(corpus, &prologs, document, id, options))
            .try_reduce(Partial::default, |a, b| Ok(a.merge(b)))
    };

    let partial = if options.jobs > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.jobs)
            .build()
            .map_err(|e| ArtagsError::ThreadPool(e.to_string()))?;
        pool.install(run)?
    } else {
        run()?
    };

    let stats = IndexStats {
        documents: corpus.documents.len(),
        skipped: corpus.skipped,
        references: references.len(),
        dangling: partial.dangling,
        records: partial.records.len(),
    };
    info!(
        "Indexed {} references into {} records ({} dangling)",
        stats.references, stats.records, stats.dangling
    );

    Ok(IndexResult {
        records: partial.records,
        stats,
    })
}

fn index_reference(
    corpus: &Corpus,
    prologs: &[Option<usize>],
    document: usize,
    id: NodeId,
    options: &IndexOptions,
) -> Result<Partial> {
    let source = &corpus.documents[document];
    let reference = reference_text(source, id);
    let symbol = symbol_of(&reference);
    let targets = resolve_reference(&reference, &corpus.documents, &options.resolver);

    let mut partial = Partial::default();
    if targets.is_empty() {
        debug!("Dangling reference '{}' in {}", reference, source.path().display());
        partial.dangling = 1;
        return Ok(partial);
    }

    for target in targets {
        let record = make_record(corpus, prologs, target, symbol, &reference, options).map_err(
            |e| ArtagsError::Resolution {
                path: source.path().to_path_buf(),
                reference: reference.clone(),
                source: Box::new(e),
            },
        )?;
        partial.records.insert(record);
    }
    Ok(partial)
}

fn make_record(
    corpus: &Corpus,
    prologs: &[Option<usize>],
    target: Target,
    symbol: &str,
    reference: &str,
    options: &IndexOptions,
) -> Result<Record> {
    let document = &corpus.documents[target.document];
    let element = document.element(target.node).ok_or_else(|| {
        ArtagsError::traversal(document.path(), format!("node {} is not an element", target.node))
    })?;

    let locator = match options.locator {
        LocatorMode::Line => {
            let prolog = match prologs.get(target.document).copied().flatten() {
                Some(lines) => lines,
                None => prolog_line_count(document, options.root_marker.as_deref())?,
            };
            Locator::Line(prolog + line_number_within_body(document, target.node)?)
        }
        LocatorMode::Pattern => Locator::Pattern(search_pattern(
            document,
            target.node,
            symbol,
            options.pattern_limit,
        )),
    };

    if log_enabled!(Level::Trace) {
        let canonical = canonical_path(document, target.node, &options.resolver)?;
        if canonical != reference {
            trace!("'{}' matched {} in {}", reference, canonical, document.path().display());
        }
    }

    Ok(Record::new(
        symbol,
        document.path(),
        locator,
        element.qname.clone(),
        reference,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArtagsConfig;
    use crate::resolver::own_name;
    use std::fs;
    use tempfile::TempDir;

    const DEFS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<AUTOSAR>
  <AR-PACKAGES>
    <AR-PACKAGE>
      <SHORT-NAME>Pkg</SHORT-NAME>
      <ELEMENTS>
        <SENDER-RECEIVER-INTERFACE>
          <SHORT-NAME>Interface</SHORT-NAME>
          <IMPLEMENTATION-DATA-TYPE>
            <SHORT-NAME>ImplDataType</SHORT-NAME>
            <SUB-ELEMENTS>
              <ELEMENT>
                <SHORT-NAME>sint8</SHORT-NAME>
              </ELEMENT>
            </SUB-ELEMENTS>
          </IMPLEMENTATION-DATA-TYPE>
        </SENDER-RECEIVER-INTERFACE>
      </ELEMENTS>
    </AR-PACKAGE>
  </AR-PACKAGES>
</AUTOSAR>
"#;

    const USES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<AUTOSAR>
  <COMPONENT>
    <SHORT-NAME>Swc</SHORT-NAME>
    <TYPE-TREF DEST="IMPLEMENTATION-DATA-TYPE">/Pkg/Interface/sint8</TYPE-TREF>
    <TYPE-TREF DEST="IMPLEMENTATION-DATA-TYPE">/Pkg/Interface/sint8</TYPE-TREF>
    <TYPE-TREF DEST="IMPLEMENTATION-DATA-TYPE">/Pkg/Missing</TYPE-TREF>
  </COMPONENT>
</AUTOSAR>
"#;

    fn line_of(source: &str, needle: &str) -> usize {
        source.lines().position(|l| l.contains(needle)).unwrap() + 1
    }

    fn corpus(files: &[(&str, &str)]) -> Corpus {
        Corpus::new(
            files
                .iter()
                .map(|(path, source)| Document::parse(*path, *source).unwrap())
                .collect(),
        )
    }

    #[test]
    fn test_cross_file_resolution() {
        let corpus = corpus(&[("defs.arxml", DEFS), ("uses.arxml", USES)]);
        let result = build_index(&corpus, &IndexOptions::default()).unwrap();

        let expected = Record::new(
            "sint8",
            "defs.arxml",
            Locator::Line(line_of(DEFS, ">sint8<") - 1),
            "ELEMENT",
            "/Pkg/Interface/sint8",
        );
        assert!(result.records.contains(&expected), "{:?}", result.records);
    }

    #[test]
    fn test_location_is_opening_tag_line() {
        let corpus = corpus(&[("defs.arxml", DEFS), ("uses.arxml", USES)]);
        let result = build_index(&corpus, &IndexOptions::default()).unwrap();
        let record = result.records.iter().find(|r| r.symbol == "sint8").unwrap();
        assert_eq!(record.locator, Locator::Line(line_of(DEFS, "<ELEMENT>")));
    }

    #[test]
    fn test_duplicate_references_dedup() {
        let corpus = corpus(&[("defs.arxml", DEFS), ("uses.arxml", USES)]);
        let result = build_index(&corpus, &IndexOptions::default()).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.stats.references, 3);
        assert_eq!(result.stats.dangling, 1);
        assert_eq!(result.stats.records, 1);
    }

    #[test]
    fn test_idempotent() {
        let corpus = corpus(&[("defs.arxml", DEFS), ("uses.arxml", USES)]);
        let first = build_index(&corpus, &IndexOptions::default()).unwrap();
        let second = build_index(&corpus, &IndexOptions::default()).unwrap();
        assert_eq!(first.records, second.records);
    }

    #[test]
    fn test_dedicated_pool() {
        let corpus = corpus(&[("defs.arxml", DEFS), ("uses.arxml", USES)]);
        let options = IndexOptions {
            jobs: 2,
            ..IndexOptions::default()
        };
        let pooled = build_index(&corpus, &options).unwrap();
        let global = build_index(&corpus, &IndexOptions::default()).unwrap();
        assert_eq!(pooled.records, global.records);
    }

    #[test]
    fn test_nested_duplicates_yield_distinct_records() {
        let source = r#"<AUTOSAR>
  <P>
    <SHORT-NAME>Parent</SHORT-NAME>
    <X>
      <SHORT-NAME>sint8</SHORT-NAME>
    </X>
    <C>
      <SHORT-NAME>Child</SHORT-NAME>
      <X>
        <SHORT-NAME>sint8</SHORT-NAME>
      </X>
    </C>
    <R DEST="X">/Parent/Child/sint8</R>
    <R DEST="X">/Parent/sint8</R>
  </P>
</AUTOSAR>
"#;
        let corpus = corpus(&[("nested.arxml", source)]);
        let result = build_index(&corpus, &IndexOptions::default()).unwrap();

        let deep = Record::new("sint8", "nested.arxml", Locator::Line(9), "X", "/Parent/Child/sint8");
        let shallow = Record::new("sint8", "nested.arxml", Locator::Line(4), "X", "/Parent/sint8");
        assert!(result.records.contains(&deep));
        assert!(result.records.contains(&shallow));
    }

    #[test]
    fn test_prolog_comments_offset() {
        let source = "<?xml version=\"1.0\"?>\n<!-- generated -->\n<!-- do not edit -->\n<!--\n-->\n<AUTOSAR>\n  <P>\n    <SHORT-NAME>Pkg</SHORT-NAME>\n    <R DEST=\"P\">/Pkg</R>\n  </P>\n</AUTOSAR>\n";
        let corpus = corpus(&[("c.arxml", source)]);
        let result = build_index(&corpus, &IndexOptions::default()).unwrap();
        let record = result.records.iter().next().unwrap();
        assert_eq!(record.locator, Locator::Line(line_of(source, "<P>")));
        assert_eq!(record.hierarchy_path, "/Pkg");
    }

    #[test]
    fn test_pattern_locator() {
        let corpus = corpus(&[("defs.arxml", DEFS), ("uses.arxml", USES)]);
        let options = IndexOptions {
            locator: LocatorMode::Pattern,
            ..IndexOptions::default()
        };
        let result = build_index(&corpus, &options).unwrap();
        let record = result.records.iter().next().unwrap();
        match &record.locator {
            Locator::Pattern(pattern) => assert!(pattern.starts_with("/sint8")),
            other => panic!("unexpected locator {:?}", other),
        }
    }

    #[test]
    fn test_missing_root_marker_is_fatal() {
        let corpus = corpus(&[("defs.arxml", DEFS), ("uses.arxml", USES)]);
        let options = IndexOptions {
            root_marker: Some("<NOT-THERE".to_string()),
            ..IndexOptions::default()
        };
        let err = build_index(&corpus, &options).unwrap_err();
        match err {
            ArtagsError::Resolution { reference, source, .. } => {
                assert_eq!(reference, "/Pkg/Interface/sint8");
                assert!(matches!(*source, ArtagsError::RootMarkerNotFound { .. }));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_load_skips_malformed() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.arxml");
        let bad = dir.path().join("bad.arxml");
        fs::write(&good, DEFS).unwrap();
        fs::write(&bad, "<AUTOSAR><unclosed></AUTOSAR>").unwrap();

        let corpus = Corpus::load(&[good, bad], &IndexOptions::default()).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.skipped(), 1);
    }

    #[test]
    fn test_output_charset_leaves_undeclared_utf8_input_intact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("motor.arxml");
        fs::write(&path, "<AUTOSAR><P><SHORT-NAME>Motor\u{e9}</SHORT-NAME></P></AUTOSAR>").unwrap();

        for output in ["US-ASCII", "ISO-8859-1"] {
            let config = ArtagsConfig {
                charset: output.to_string(),
                ..ArtagsConfig::default()
            };
            let options = config.index_options().unwrap();
            let corpus = Corpus::load(&[path.clone()], &options).unwrap();
            assert_eq!(corpus.skipped(), 0, "{}", output);

            let document = &corpus.documents()[0];
            let package = document.element_children(Document::ROOT).next().unwrap();
            assert_eq!(own_name(document, package, &options.resolver), "Motor\u{e9}");
        }
    }

    #[test]
    fn test_load_unsupported_charset_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("odd.arxml");
        fs::write(&path, "<?xml version=\"1.0\" encoding=\"EBCDIC-XYZ\"?>\n<AUTOSAR/>").unwrap();

        let err = Corpus::load(&[path], &IndexOptions::default()).unwrap_err();
        assert!(matches!(err, ArtagsError::UnsupportedCharset(_)));
    }

    #[test]
    fn test_sorted() {
        let mut result = IndexResult::default();
        result.records.insert(Record::new("b", "f", Locator::Line(1), "T", "/b"));
        result.records.insert(Record::new("a", "f", Locator::Line(2), "T", "/a"));
        let symbols: Vec<&str> = result.sorted().iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["a", "b"]);
    }
}
