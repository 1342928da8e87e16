//! Per-directory manifest state.
//!
//! A [`DirectoryState`] is transient — recreated each run — and combines the
//! live checksum computation, the staleness decision, the manifest
//! write/read, and verify-with-diff for one directory. The manifest file on
//! disk is the only persisted state.

use crate::checksum::ChecksumSet;
use crate::error::SealError;
use crate::events::{ChangeEvent, Decision, EventSink};
use crate::trust::TrustPolicy;
use filetime::FileTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One directory plus the location of its manifest.
#[derive(Debug, Clone)]
pub struct DirectoryState {
    path: PathBuf,
    manifest_path: PathBuf,
    manifest_name: String,
}

impl DirectoryState {
    pub fn new(path: PathBuf, manifest_name: &str) -> Self {
        let manifest_path = path.join(manifest_name);
        Self {
            path,
            manifest_path,
            manifest_name: manifest_name.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Sorted base names of the directory's live entries, the manifest file
    /// itself excluded.
    fn live_names(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name != self.manifest_name {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Compute the live checksum set for this directory.
    pub fn live_checksums(&self) -> Result<ChecksumSet, SealError> {
        let names = self.live_names()?;
        ChecksumSet::for_entries(&self.path, &names, &self.manifest_name)
    }

    /// True iff the directory has zero live entries and no manifest.
    ///
    /// Such directories are excluded from batch runs so manifests are not
    /// littered into directories that never held anything of interest. A
    /// directory that cannot be listed is also reported ignored, which
    /// carries the scanner's best-effort skip policy through to processing.
    pub fn ignored(&self) -> bool {
        match self.live_names() {
            Ok(names) => names.is_empty() && !self.manifest_path.exists(),
            Err(e) => {
                debug!(dir = %self.path.display(), error = %e, "Cannot list directory; skipping");
                true
            }
        }
    }

    /// Whether the manifest is missing or older than the newest live entry.
    ///
    /// This is the incremental-update mechanism: a changed file, or a changed
    /// subdirectory whose own mtime was bumped by its manifest write, marks
    /// this directory stale without rehashing anything.
    pub fn needs_update(&self) -> Result<bool, SealError> {
        let manifest_mtime = match fs::symlink_metadata(&self.manifest_path) {
            Ok(meta) => meta.modified()?,
            Err(_) => return Ok(true),
        };
        for name in self.live_names()? {
            let Ok(meta) = fs::symlink_metadata(self.path.join(&name)) else {
                continue;
            };
            let Ok(mtime) = meta.modified() else {
                continue;
            };
            if mtime > manifest_mtime {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Compute, sign, and persist the manifest, then bump the directory's
    /// own mtime so the parent's staleness check observes the change.
    pub fn write(&self, policy: &dyn TrustPolicy) -> Result<(), SealError> {
        let checksums = self.live_checksums()?;
        let text = checksums.to_manifest_text();
        let envelope = policy.sign(&text)?;
        fs::write(&self.manifest_path, &envelope)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.manifest_path, fs::Permissions::from_mode(0o644))?;
            // Reset the group to the process's own, overriding any
            // setgid-inherited group on the containing directory.
            nix::unistd::chown(
                self.manifest_path.as_path(),
                None,
                Some(nix::unistd::getegid()),
            )
            .map_err(|e| SealError::IoError(io::Error::from(e)))?;
        }

        filetime::set_file_mtime(&self.path, FileTime::now())?;
        debug!(dir = %self.path.display(), entries = checksums.len(), "Wrote manifest");
        Ok(())
    }

    /// Verify the directory against its manifest, emitting events.
    ///
    /// A missing manifest is not an error: the expected state is the empty
    /// set, so every live entry reports as added and no signature event is
    /// emitted. Otherwise the signature event is emitted unconditionally,
    /// before the diff and independent of its outcome; only an explicit
    /// `SkipDirectory` decision from the sink skips the diff.
    pub fn verify(
        &self,
        policy: &dyn TrustPolicy,
        sink: &mut dyn EventSink,
    ) -> Result<(), SealError> {
        let live = self.live_checksums()?;

        let envelope = match fs::read(&self.manifest_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return ChecksumSet::diff(&ChecksumSet::empty(), &live, &self.path, sink);
            }
            Err(e) => return Err(e.into()),
        };

        let opened = policy.open(&envelope)?;
        let event = if opened.valid {
            ChangeEvent::ValidSignature {
                dir: self.path.clone(),
                policy: policy.describe(),
                message: opened.message,
            }
        } else {
            ChangeEvent::InvalidSignature {
                dir: self.path.clone(),
                policy: policy.describe(),
                message: opened.message,
            }
        };
        if sink.handle(event) == Decision::SkipDirectory {
            return Ok(());
        }

        let text = String::from_utf8(opened.payload).map_err(|_| SealError::ManifestNotUtf8 {
            dir: self.path.clone(),
        })?;
        let expected = ChecksumSet::from_manifest_text(&text);
        ChecksumSet::diff(&expected, &live, &self.path, sink)
    }

    /// Remove the manifest file; a missing manifest is a no-op.
    pub fn delete(&self) -> Result<(), SealError> {
        match fs::remove_file(&self.manifest_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
