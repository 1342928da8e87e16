//! Bottom-up filesystem scanner.
//!
//! Yields the directories under a root so that every directory appears
//! strictly after all of its non-excluded subdirectories and before its own
//! parent; sibling order is unspecified. This ordering is what makes
//! hierarchical manifest hashing correct: by the time a parent hashes a
//! child directory's manifest, that manifest has already been finalized.

use crate::error::SealError;
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Glob semantics for exclude patterns: `*` never matches across a path
/// separator, matching is case sensitive.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Bottom-up directory scanner for one root.
pub struct PathScanner {
    root: PathBuf,
    excludes: Vec<Pattern>,
}

impl PathScanner {
    /// Create a scanner for `root` with the given exclude patterns.
    ///
    /// Patterns are matched against each candidate's path relative to the
    /// root. A pattern that matches nothing is not an error.
    pub fn new(root: PathBuf, exclude_patterns: &[String]) -> Result<Self, SealError> {
        let excludes = exclude_patterns
            .iter()
            .map(|p| {
                Pattern::new(p)
                    .map_err(|e| SealError::ConfigError(format!("Invalid exclude pattern {:?}: {}", p, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { root, excludes })
    }

    /// Lazy sequence of directories in children-before-parents order.
    ///
    /// Excluded directories are neither yielded nor descended into. Symbolic
    /// links are never followed. A directory that cannot be listed (vanished
    /// mid-scan, permission denied) is skipped along with its subtree without
    /// aborting the rest of the scan.
    pub fn directories(self) -> impl Iterator<Item = PathBuf> {
        let Self { root, excludes } = self;
        let filter_root = root.clone();
        WalkDir::new(&root)
            .follow_links(false)
            .contents_first(true)
            .into_iter()
            .filter_entry(move |entry| !is_excluded(&filter_root, &excludes, entry.path()))
            .filter_map(|result| match result {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable entry during scan");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_dir())
            .map(|entry| entry.into_path())
    }
}

/// Whether `path` (absolute, under `root`) matches an exclude pattern.
fn is_excluded(root: &Path, excludes: &[Pattern], path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    if relative.as_os_str().is_empty() {
        // Never exclude the root itself.
        return false;
    }
    excludes
        .iter()
        .any(|p| p.matches_path_with(relative, MATCH_OPTIONS))
}
