//! Corpus discovery
//!
//! The exclude pattern must match a whole path. A matching directory prunes
//! its subtree; a matching file excludes only itself.

use crate::error::{ArtagsError, Result};
use log::{debug, warn};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collect model files under `roots`, sorted and without duplicates.
pub fn discover(roots: &[PathBuf], extensions: &[String], exclude: Option<&str>) -> Result<Vec<PathBuf>> {
    let exclude = exclude
        .map(|pattern| Regex::new(&format!("^(?:{})$", pattern)))
        .transpose()?;

    let mut files = Vec::new();
    for root in roots {
        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| !is_excluded(exclude.as_ref(), entry.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(ArtagsError::Walk {
                        path: root.clone(),
                        source: e,
                    })
                }
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };

            if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
                files.push(entry.into_path());
            }
        }
    }

    files.sort();
    files.dedup();
    debug!("Discovered {} files", files.len());
    Ok(files)
}

fn is_excluded(exclude: Option<&Regex>, path: &Path) -> bool {
    let Some(regex) = exclude else {
        return false;
    };
    let excluded = regex.is_match(&path.to_string_lossy());
    if excluded {
        debug!("Excluding {}", path.display());
    }
    excluded
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted == ext))
}
