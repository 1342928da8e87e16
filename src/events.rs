//! Change events and event sinks.
//!
//! Every observation made during a verify pass — signature status, directory
//! level change, per-item change — is delivered as a [`ChangeEvent`] to an
//! [`EventSink`]. The sink answers each event with a [`Decision`], which lets
//! a consumer cooperatively skip the remaining item comparisons for a
//! directory, or skip a directory outright after seeing its signature status.

use crate::types::Digest;
use owo_colors::OwoColorize;
use std::path::PathBuf;

/// One observation from a verify pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// The manifest envelope carried a signature accepted by the trust policy.
    ValidSignature {
        dir: PathBuf,
        policy: String,
        message: String,
    },
    /// The manifest envelope failed the trust policy's acceptance check.
    InvalidSignature {
        dir: PathBuf,
        policy: String,
        message: String,
    },
    /// Live state structurally equals the manifest. No item events follow.
    DirectoryUnchanged { dir: PathBuf },
    /// Live state differs from the manifest. Item events follow unless the
    /// sink answers `SkipItems`.
    DirectoryChanged { dir: PathBuf },
    ItemUnchanged {
        dir: PathBuf,
        name: String,
        digest: Digest,
    },
    ItemChanged {
        dir: PathBuf,
        name: String,
        expected: Digest,
        actual: Digest,
    },
    ItemAdded {
        dir: PathBuf,
        name: String,
        digest: Digest,
    },
    ItemRemoved {
        dir: PathBuf,
        name: String,
        digest: Digest,
    },
}

impl ChangeEvent {
    /// Whether this event indicates a deviation from the attested state.
    pub fn is_deviation(&self) -> bool {
        matches!(
            self,
            ChangeEvent::InvalidSignature { .. }
                | ChangeEvent::DirectoryChanged { .. }
                | ChangeEvent::ItemChanged { .. }
                | ChangeEvent::ItemAdded { .. }
                | ChangeEvent::ItemRemoved { .. }
        )
    }
}

/// Sink response controlling how much remaining work the driver performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep delivering events.
    Continue,
    /// Stop comparing items in the current directory.
    SkipItems,
    /// Stop all remaining work (signature and diff) for the current directory.
    SkipDirectory,
}

/// Consumer of verify events.
pub trait EventSink {
    fn handle(&mut self, event: ChangeEvent) -> Decision;
}

/// Collecting sink: records every event for structured inspection.
#[derive(Debug, Default)]
pub struct Report {
    events: Vec<ChangeEvent>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    /// Directories that reported as changed.
    pub fn changed_dirs(&self) -> Vec<&PathBuf> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ChangeEvent::DirectoryChanged { dir } => Some(dir),
                _ => None,
            })
            .collect()
    }

    /// Count of invalid-signature events.
    pub fn invalid_signatures(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ChangeEvent::InvalidSignature { .. }))
            .count()
    }

    /// True when no event indicated a deviation.
    pub fn is_clean(&self) -> bool {
        !self.events.iter().any(ChangeEvent::is_deviation)
    }
}

impl EventSink for Report {
    fn handle(&mut self, event: ChangeEvent) -> Decision {
        self.events.push(event);
        Decision::Continue
    }
}

/// Live-dispatch sink for the CLI: prints events as they arrive and applies
/// the `--signatures-only` / `--dirs-only` short-circuits.
#[derive(Debug)]
pub struct ConsoleSink {
    verbose: bool,
    signatures_only: bool,
    dirs_only: bool,
    deviations: usize,
}

impl ConsoleSink {
    pub fn new(verbose: bool, signatures_only: bool, dirs_only: bool) -> Self {
        Self {
            verbose,
            signatures_only,
            dirs_only,
            deviations: 0,
        }
    }

    /// Number of deviation events seen so far.
    pub fn deviations(&self) -> usize {
        self.deviations
    }
}

impl EventSink for ConsoleSink {
    fn handle(&mut self, event: ChangeEvent) -> Decision {
        if event.is_deviation() {
            self.deviations += 1;
        }
        match &event {
            ChangeEvent::ValidSignature { dir, message, .. } => {
                if self.verbose {
                    println!("{} {}: {}", "signature ok".green(), dir.display(), message);
                }
                if self.signatures_only {
                    return Decision::SkipDirectory;
                }
            }
            ChangeEvent::InvalidSignature { dir, message, .. } => {
                println!(
                    "{} {}: {}",
                    "INVALID SIGNATURE".red().bold(),
                    dir.display(),
                    message
                );
                if self.signatures_only {
                    return Decision::SkipDirectory;
                }
            }
            ChangeEvent::DirectoryUnchanged { dir } => {
                if self.verbose {
                    println!("{} {}", "unchanged".green(), dir.display());
                }
            }
            ChangeEvent::DirectoryChanged { dir } => {
                println!("{} {}", "changed".yellow().bold(), dir.display());
                if self.dirs_only {
                    return Decision::SkipItems;
                }
            }
            ChangeEvent::ItemUnchanged { dir, name, .. } => {
                if self.verbose {
                    println!("  {} {}/{}", "ok".green(), dir.display(), name);
                }
            }
            ChangeEvent::ItemChanged {
                dir,
                name,
                expected,
                actual,
            } => {
                println!(
                    "  {} {}/{} ({} -> {})",
                    "modified".yellow(),
                    dir.display(),
                    name,
                    short(expected),
                    short(actual)
                );
            }
            ChangeEvent::ItemAdded { dir, name, .. } => {
                println!("  {} {}/{}", "added".cyan(), dir.display(), name);
            }
            ChangeEvent::ItemRemoved { dir, name, .. } => {
                println!("  {} {}/{}", "removed".red(), dir.display(), name);
            }
        }
        Decision::Continue
    }
}

/// Abbreviate a digest for console output; sentinels print as-is.
fn short(digest: &str) -> &str {
    if digest.len() > 12 {
        &digest[..12]
    } else {
        digest
    }
}
