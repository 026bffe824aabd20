//! Indexer configuration

use crate::charset::Charset;
use crate::error::Result;
use crate::indexer::{IndexOptions, LocatorMode};
use crate::pattern::DEFAULT_PATTERN_LIMIT;
use crate::resolver::{Anchor, ResolverOptions};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File names searched by [`ArtagsConfig::find_and_load`], in order.
pub const CONFIG_NAMES: [&str; 3] = [".artagsrc.json", ".artagsrc", "artags.json"];

/// Settings read from a JSON config file. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtagsConfig {
    /// File extensions that make up the corpus
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Child element holding an element's name
    #[serde(default = "default_name_element")]
    pub name_element: String,

    /// Attribute marking reference elements
    #[serde(default = "default_reference_attribute")]
    pub reference_attribute: String,

    /// Literal text of the root start tag, e.g. `<AUTOSAR`
    #[serde(default)]
    pub root_marker: Option<String>,

    #[serde(default)]
    pub anchor: Anchor,

    /// Emit search patterns instead of line numbers
    #[serde(default)]
    pub pattern: bool,

    #[serde(default = "default_pattern_limit")]
    pub pattern_limit: usize,

    /// Tags file charset
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Charset of input files that have neither BOM nor encoding declaration
    #[serde(default = "default_charset")]
    pub input_charset: String,

    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Regex matched against whole paths
    #[serde(default)]
    pub exclude: Option<String>,

    /// Worker threads (0 = one per core)
    #[serde(default)]
    pub jobs: usize,
}

fn default_extensions() -> Vec<String> {
    vec!["arxml".to_string()]
}

fn default_name_element() -> String {
    "SHORT-NAME".to_string()
}

fn default_reference_attribute() -> String {
    "DEST".to_string()
}

fn default_pattern_limit() -> usize {
    DEFAULT_PATTERN_LIMIT
}

fn default_charset() -> String {
    "UTF-8".to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from("./tags")
}

impl Default for ArtagsConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            name_element: default_name_element(),
            reference_attribute: default_reference_attribute(),
            root_marker: None,
            anchor: Anchor::Anywhere,
            pattern: false,
            pattern_limit: DEFAULT_PATTERN_LIMIT,
            charset: default_charset(),
            input_charset: default_charset(),
            output: default_output(),
            exclude: None,
            jobs: 0,
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub output: Option<PathBuf>,
    pub charset: Option<String>,
    pub exclude: Option<String>,
    pub anchor: Option<Anchor>,
    pub root_marker: Option<String>,
    pub pattern: bool,
    pub jobs: Option<usize>,
}

impl ArtagsConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Look for a config file in `start_dir` and each of its ancestors.
    ///
    /// A file that fails to load is reported and the search continues upward.
    pub fn find_and_load(start_dir: &Path) -> Option<Self> {
        let mut current = Some(start_dir);
        while let Some(dir) = current {
            for name in &CONFIG_NAMES {
                let config_path = dir.join(name);
                if !config_path.is_file() {
                    continue;
                }
                match Self::load(&config_path) {
                    Ok(config) => {
                        debug!("Using config {}", config_path.display());
                        return Some(config);
                    }
                    Err(e) => warn!("{}", e),
                }
            }
            current = dir.parent();
        }

        None
    }

    /// Apply command-line values on top of this config.
    pub fn merge_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(output) = cli.output {
            self.output = output;
        }
        if let Some(charset) = cli.charset {
            self.charset = charset;
        }
        if cli.exclude.is_some() {
            self.exclude = cli.exclude;
        }
        if let Some(anchor) = cli.anchor {
            self.anchor = anchor;
        }
        if cli.root_marker.is_some() {
            self.root_marker = cli.root_marker;
        }
        self.pattern |= cli.pattern;
        if let Some(jobs) = cli.jobs {
            self.jobs = jobs;
        }
        self
    }

    /// Charset of the tags file.
    pub fn charset(&self) -> Result<Charset> {
        Charset::for_name(&self.charset)
    }

    pub fn index_options(&self) -> Result<IndexOptions> {
        Ok(IndexOptions {
            resolver: ResolverOptions {
                name_element: self.name_element.clone(),
                reference_attribute: self.reference_attribute.clone(),
                anchor: self.anchor,
            },
            root_marker: self.root_marker.clone(),
            locator: if self.pattern {
                LocatorMode::Pattern
            } else {
                LocatorMode::Line
            },
            pattern_limit: self.pattern_limit,
            jobs: self.jobs,
            input_charset: Charset::for_name(&self.input_charset)?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}
