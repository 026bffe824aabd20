//! Tag records and their tags-file rendering
//!
//! Line grammar (tab separated):
//!
//! ```text
//! SYMBOL	FILE	LOCATION;"		HIERARCHY_PATH (TYPE)	file:
//! ```

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// How an editor finds the definition inside its file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Locator {
    /// 1-based line number.
    Line(usize),
    /// Search pattern including its `/` delimiters.
    Pattern(String),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Line(line) => write!(f, "{}", line),
            Locator::Pattern(pattern) => f.write_str(pattern),
        }
    }
}

/// One resolved tag. Equality covers all five fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Record {
    pub symbol: String,
    pub file_path: PathBuf,
    pub locator: Locator,
    /// Tag name of the defining element.
    pub element_type: String,
    /// Reference text exactly as written at the reference site.
    pub hierarchy_path: String,
}

impl Record {
    pub fn new(
        symbol: impl Into<String>,
        file_path: impl Into<PathBuf>,
        locator: Locator,
        element_type: impl Into<String>,
        hierarchy_path: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            file_path: file_path.into(),
            locator,
            element_type: element_type.into(),
            hierarchy_path: hierarchy_path.into(),
        }
    }

    /// Tags line with the file path as stored.
    pub fn format(&self) -> String {
        self.render(&self.file_path)
    }

    /// Tags line with the file path relative to `output_dir`.
    ///
    /// Both paths are made absolute first, so the result does not depend on
    /// how either was spelled. Falls back to the absolute file path when no
    /// relative form exists (e.g. different drive prefixes).
    pub fn format_relative(&self, output_dir: &Path) -> String {
        self.render(&self.relative_path(output_dir))
    }

    /// This record's file path relative to `output_dir`.
    pub fn relative_path(&self, output_dir: &Path) -> PathBuf {
        let file = absolute(&self.file_path);
        let dir = absolute(output_dir);
        pathdiff::diff_paths(&file, &dir).unwrap_or(file)
    }

    fn render(&self, file: &Path) -> String {
        format!(
            "{}\t{}\t{};\"\t\t{} ({})\tfile:",
            self.symbol,
            file.display(),
            self.locator,
            self.hierarchy_path,
            self.element_type
        )
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
