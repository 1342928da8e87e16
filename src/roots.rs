//! Root sets: the ordered sequence of directories a run processes.
//!
//! In recursive mode the scanner supplies each root's subtree bottom-up, so
//! by the time a parent is processed every non-excluded child's manifest has
//! already been finalized in the same pass. Non-recursive mode yields exactly
//! the given roots. Both modes filter out ignored directories lazily; large
//! trees are never fully materialized.

use crate::config::RunConfig;
use crate::error::SealError;
use crate::scanner::PathScanner;
use crate::state::DirectoryState;
use std::path::PathBuf;

/// The roots of one run, plus the configuration driving traversal.
pub struct RootSet {
    roots: Vec<PathBuf>,
    config: RunConfig,
}

impl RootSet {
    pub fn new(roots: Vec<PathBuf>, config: RunConfig) -> Self {
        Self { roots, config }
    }

    /// Lazy, ordered sequence of directory states for this run.
    pub fn directories(
        &self,
    ) -> Result<Box<dyn Iterator<Item = DirectoryState> + '_>, SealError> {
        let manifest_name = self.config.manifest_name.clone();
        if self.config.recursive {
            let mut scanners = Vec::with_capacity(self.roots.len());
            for root in &self.roots {
                scanners.push(PathScanner::new(root.clone(), &self.config.excludes)?);
            }
            Ok(Box::new(
                scanners
                    .into_iter()
                    .flat_map(PathScanner::directories)
                    .map(move |path| DirectoryState::new(path, &manifest_name))
                    .filter(|state| !state.ignored()),
            ))
        } else {
            Ok(Box::new(
                self.roots
                    .clone()
                    .into_iter()
                    .map(move |path| DirectoryState::new(path, &manifest_name))
                    .filter(|state| !state.ignored()),
            ))
        }
    }
}
