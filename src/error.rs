//! Error types for tag generation

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while loading, resolving, or writing tags.
#[derive(Error, Debug)]
pub enum ArtagsError {
    /// Failed to read a document from disk.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Document is not well-formed XML.
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Document bytes are not valid in the charset they declare.
    #[error("Failed to decode {path} as {charset}")]
    Decode { path: PathBuf, charset: String },

    /// Charset name has no known codec.
    #[error("Unsupported charset '{0}'")]
    UnsupportedCharset(String),

    /// Output text contains a character the output charset cannot represent.
    #[error("Cannot encode {ch:?} as {charset}")]
    Encode { charset: String, ch: char },

    /// Tree walk reached a state that a well-formed arena never produces.
    #[error("Structural traversal failed in {path}: {reason}")]
    Traversal { path: PathBuf, reason: String },

    /// Raw prolog scan never met the root marker.
    #[error("Root marker '{marker}' not found in {path}")]
    RootMarkerNotFound { path: PathBuf, marker: String },

    /// A fatal error raised while handling one reference element.
    #[error("While resolving '{reference}' from {path}: {source}")]
    Resolution {
        path: PathBuf,
        reference: String,
        #[source]
        source: Box<ArtagsError>,
    },

    /// Directory traversal failed.
    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// Exclude pattern is not a valid regular expression.
    #[error("Invalid exclude pattern: {0}")]
    ExcludePattern(#[from] regex::Error),

    /// Output file could not be opened or written.
    #[error("Cannot write output {path}: {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Output path has no usable parent directory.
    #[error("OUTPUT_FILE is invalid: {0}")]
    OutputPath(PathBuf),

    /// Worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ArtagsError {
    /// Whether the run may continue after skipping the document that raised this.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ArtagsError::Read { .. } | ArtagsError::Parse { .. } | ArtagsError::Decode { .. }
        )
    }

    pub(crate) fn traversal(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ArtagsError::Traversal {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ArtagsError>;
