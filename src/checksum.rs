//! Checksum sets: the per-directory collection of (name, digest) pairs.
//!
//! A [`ChecksumSet`] is computed either from a directory's live entries or
//! parsed from persisted manifest text. Both forms hold the same invariant:
//! entries strictly sorted ascending by name, no duplicates. The linear-merge
//! diff below depends on that invariant and treats a violation as a fatal
//! internal-consistency error.

use crate::error::SealError;
use crate::events::{ChangeEvent, Decision, EventSink};
use crate::hasher;
use crate::types::{Digest, DIGEST_UNCHECKED, DIGEST_UNSUPPORTED};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use tracing::debug;

/// One directory child: base filename and content digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub digest: Digest,
}

/// Sorted collection of a directory's immediate children and their digests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChecksumSet {
    entries: Vec<Entry>,
}

impl ChecksumSet {
    /// Empty set; the expected baseline for a never-attested directory.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set from arbitrary entries, sorting by name.
    pub fn from_entries(mut entries: Vec<Entry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self { entries }
    }

    /// Compute the live set for `dir` over the given child names.
    ///
    /// Classification is by lstat: symbolic links hash their target path
    /// string, subdirectories hash their manifest file content (or report the
    /// unchecked sentinel when none is readable), regular files hash their
    /// content, and anything else (device, socket, fifo) reports the
    /// unsupported sentinel. Read failures on regular files are fatal.
    pub fn for_entries(
        dir: &Path,
        names: &[String],
        manifest_name: &str,
    ) -> Result<Self, SealError> {
        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let path = dir.join(name);
            let meta = fs::symlink_metadata(&path)?;
            let file_type = meta.file_type();
            let digest = if file_type.is_symlink() {
                hasher::digest_link_target(&path)?
            } else if file_type.is_dir() {
                match fs::read(path.join(manifest_name)) {
                    Ok(bytes) => hasher::digest_bytes(&bytes),
                    Err(e) => {
                        debug!(dir = %path.display(), error = %e, "Subdirectory has no readable manifest");
                        DIGEST_UNCHECKED.to_string()
                    }
                }
            } else if file_type.is_file() {
                hasher::digest_file(&path)?
            } else {
                DIGEST_UNSUPPORTED.to_string()
            };
            entries.push(Entry {
                name: name.clone(),
                digest,
            });
        }
        Ok(Self::from_entries(entries))
    }

    /// Parse manifest text: one `"<digest>  <name>"` line per entry.
    ///
    /// Each line splits at its first two-space run, so a name containing two
    /// consecutive spaces mis-parses. This limitation is deliberate; the
    /// format does not escape names.
    pub fn from_manifest_text(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| {
                line.split_once("  ").map(|(digest, name)| Entry {
                    name: name.to_string(),
                    digest: digest.to_string(),
                })
            })
            .collect();
        Self::from_entries(entries)
    }

    /// Serialize to manifest text, one line per entry in sorted order.
    pub fn to_manifest_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.digest);
            out.push_str("  ");
            out.push_str(&entry.name);
            out.push('\n');
        }
        out
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry's digest by name.
    pub fn digest_of(&self, name: &str) -> Option<&str> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|i| self.entries[i].digest.as_str())
    }

    fn ensure_sorted(&self, dir: &Path) -> Result<(), SealError> {
        let strictly_sorted = self.entries.windows(2).all(|w| w[0].name < w[1].name);
        if strictly_sorted {
            Ok(())
        } else {
            Err(SealError::UnsortedChecksums {
                dir: dir.to_path_buf(),
            })
        }
    }

    /// Diff `expected` against `actual`, emitting events through `sink`.
    ///
    /// Structural equality yields exactly one `DirectoryUnchanged`. Otherwise
    /// a `DirectoryChanged` is followed by item events from a two-pointer
    /// merge over the sorted sequences, name order as the sole tie-break.
    /// Any non-`Continue` decision from the sink ends the diff early.
    pub fn diff(
        expected: &ChecksumSet,
        actual: &ChecksumSet,
        dir: &Path,
        sink: &mut dyn EventSink,
    ) -> Result<(), SealError> {
        expected.ensure_sorted(dir)?;
        actual.ensure_sorted(dir)?;

        if expected == actual {
            sink.handle(ChangeEvent::DirectoryUnchanged {
                dir: dir.to_path_buf(),
            });
            return Ok(());
        }

        if sink.handle(ChangeEvent::DirectoryChanged {
            dir: dir.to_path_buf(),
        }) != Decision::Continue
        {
            return Ok(());
        }

        let exp = &expected.entries;
        let act = &actual.entries;
        let (mut e, mut a) = (0usize, 0usize);
        loop {
            let event = match (exp.get(e), act.get(a)) {
                (None, None) => break,
                (Some(x), Some(y)) => match x.name.cmp(&y.name) {
                    Ordering::Equal => {
                        let event = if x.digest == y.digest {
                            ChangeEvent::ItemUnchanged {
                                dir: dir.to_path_buf(),
                                name: x.name.clone(),
                                digest: x.digest.clone(),
                            }
                        } else {
                            ChangeEvent::ItemChanged {
                                dir: dir.to_path_buf(),
                                name: x.name.clone(),
                                expected: x.digest.clone(),
                                actual: y.digest.clone(),
                            }
                        };
                        e += 1;
                        a += 1;
                        event
                    }
                    Ordering::Less => {
                        let event = ChangeEvent::ItemRemoved {
                            dir: dir.to_path_buf(),
                            name: x.name.clone(),
                            digest: x.digest.clone(),
                        };
                        e += 1;
                        event
                    }
                    Ordering::Greater => {
                        let event = ChangeEvent::ItemAdded {
                            dir: dir.to_path_buf(),
                            name: y.name.clone(),
                            digest: y.digest.clone(),
                        };
                        a += 1;
                        event
                    }
                },
                (Some(x), None) => {
                    let event = ChangeEvent::ItemRemoved {
                        dir: dir.to_path_buf(),
                        name: x.name.clone(),
                        digest: x.digest.clone(),
                    };
                    e += 1;
                    event
                }
                (None, Some(y)) => {
                    let event = ChangeEvent::ItemAdded {
                        dir: dir.to_path_buf(),
                        name: y.name.clone(),
                        digest: y.digest.clone(),
                    };
                    a += 1;
                    event
                }
            };
            if sink.handle(event) != Decision::Continue {
                return Ok(());
            }
        }
        Ok(())
    }
}
