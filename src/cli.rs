//! Command-line interface.
//!
//! Subcommands `create`, `update`, and `verify` apply to a list of root
//! directories. All flags are folded into one immutable [`RunConfig`] before
//! any work starts; `execute` returns the process exit code.

use crate::config::{FileConfig, RunConfig, KEYRING_ENV};
use crate::error::SealError;
use crate::events::ConsoleSink;
use crate::roots::RootSet;
use crate::trust::{KeyringPolicy, NullPolicy, TrustPolicy};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

/// Dirseal CLI - tamper detection via signed per-directory manifests
#[derive(Parser)]
#[command(name = "dirseal")]
#[command(about = "Detect tampering in directory trees using signed per-directory manifests")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Print planned actions without performing any
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Descend into subdirectories (bottom-up)
    #[arg(short, long, global = true)]
    pub recursive: bool,

    /// Signing identity selector (matched against keyring file names)
    #[arg(long, global = true)]
    pub signer: Option<String>,

    /// Exclude pattern, relative to each root (repeatable shell glob)
    #[arg(long = "exclude", global = true)]
    pub excludes: Vec<String>,

    /// Report unchanged items and signature details as well
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Verify: check signatures only, skip per-directory diffs
    #[arg(long, global = true)]
    pub signatures_only: bool,

    /// Verify: report directory-level changes only, skip item diffs
    #[arg(long, global = true)]
    pub dirs_only: bool,

    /// Keyring directory of Ed25519 key files (or $DIRSEAL_KEYRING)
    #[arg(long, global = true)]
    pub keyring: Option<PathBuf>,

    /// Configuration file path (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Manifest filename written into each directory
    #[arg(long, global = true)]
    pub manifest_name: Option<String>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a signed manifest into every directory in scope
    Create {
        /// Root directories to attest
        #[arg(required = true)]
        roots: Vec<PathBuf>,
    },
    /// Rewrite manifests only where the directory is stale
    Update {
        /// Root directories to re-attest
        #[arg(required = true)]
        roots: Vec<PathBuf>,
    },
    /// Compare live state against manifests and report changes
    Verify {
        /// Root directories to check
        #[arg(required = true)]
        roots: Vec<PathBuf>,
    },
}

impl Cli {
    /// Fold flags, config file, and environment into one `RunConfig`.
    pub fn run_config(&self) -> Result<RunConfig, SealError> {
        let mut config = RunConfig {
            recursive: self.recursive,
            dry_run: self.dry_run,
            verbose: self.verbose,
            signatures_only: self.signatures_only,
            dirs_only: self.dirs_only,
            excludes: self.excludes.clone(),
            signer: self.signer.clone(),
            keyring: self.keyring.clone(),
            ..RunConfig::default()
        };
        if let Some(name) = &self.manifest_name {
            config.manifest_name = name.clone();
        }
        if let Some(path) = &self.config {
            config = config.with_file_defaults(FileConfig::load(path)?);
        }
        Ok(config.with_env_defaults())
    }
}

/// Build the trust policy selected by the configuration.
///
/// A keyring yields the real policy; a signer without a keyring is a
/// configuration error; neither yields the digest-only null policy.
pub fn build_policy(config: &RunConfig) -> Result<Box<dyn TrustPolicy>, SealError> {
    match (&config.keyring, &config.signer) {
        (Some(keyring), signer) => Ok(Box::new(KeyringPolicy::new(
            keyring.clone(),
            signer.clone().unwrap_or_default(),
        ))),
        (None, Some(_)) => Err(SealError::ConfigError(format!(
            "--signer requires a keyring (--keyring or ${})",
            KEYRING_ENV
        ))),
        (None, None) => Ok(Box::new(NullPolicy)),
    }
}

/// Execute a subcommand; returns the process exit code.
pub fn execute(command: &Commands, config: &RunConfig) -> Result<i32, SealError> {
    let policy = build_policy(config)?;
    match command {
        Commands::Create { roots } => seal(roots, config, policy.as_ref(), false),
        Commands::Update { roots } => seal(roots, config, policy.as_ref(), true),
        Commands::Verify { roots } => verify(roots, config, policy.as_ref()),
    }
}

/// Shared driver for `create` (unconditional) and `update` (stale only).
fn seal(
    roots: &[PathBuf],
    config: &RunConfig,
    policy: &dyn TrustPolicy,
    only_stale: bool,
) -> Result<i32, SealError> {
    let set = RootSet::new(roots.to_vec(), config.clone());
    let mut written = 0usize;
    let mut skipped = 0usize;
    for state in set.directories()? {
        if only_stale && !state.needs_update()? {
            skipped += 1;
            if config.verbose {
                println!("up to date: {}", state.path().display());
            }
            continue;
        }
        if config.dry_run {
            println!("would write {}", state.manifest_path().display());
            continue;
        }
        state.write(policy)?;
        info!(dir = %state.path().display(), "Manifest written");
        if config.verbose {
            println!("sealed: {}", state.path().display());
        }
        written += 1;
    }
    if !config.dry_run {
        if only_stale {
            println!("{} directories updated, {} already current", written, skipped);
        } else {
            println!("{} directories sealed", written);
        }
    }
    Ok(0)
}

fn verify(
    roots: &[PathBuf],
    config: &RunConfig,
    policy: &dyn TrustPolicy,
) -> Result<i32, SealError> {
    let set = RootSet::new(roots.to_vec(), config.clone());
    let mut sink = ConsoleSink::new(config.verbose, config.signatures_only, config.dirs_only);
    let mut checked = 0usize;
    for state in set.directories()? {
        if config.dry_run {
            println!("would verify {}", state.path().display());
            continue;
        }
        state.verify(policy, &mut sink)?;
        checked += 1;
    }
    if config.dry_run {
        return Ok(0);
    }
    if sink.deviations() == 0 {
        println!("{} directories verified, no changes", checked);
        Ok(0)
    } else {
        println!(
            "{} directories verified, {} deviations",
            checked,
            sink.deviations()
        );
        Ok(1)
    }
}
