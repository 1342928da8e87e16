//! Run configuration.
//!
//! One immutable [`RunConfig`] value is built at startup from CLI flags, the
//! optional TOML config file, and the environment, then threaded through the
//! root-set and directory-state constructors. There is no ambient mutable
//! configuration.

use crate::error::SealError;
use crate::types::MANIFEST_NAME;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Environment variable naming the keyring directory.
pub const KEYRING_ENV: &str = "DIRSEAL_KEYRING";

/// Immutable configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub recursive: bool,
    pub dry_run: bool,
    pub verbose: bool,
    pub signatures_only: bool,
    pub dirs_only: bool,
    pub excludes: Vec<String>,
    pub signer: Option<String>,
    pub keyring: Option<PathBuf>,
    pub manifest_name: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            dry_run: false,
            verbose: false,
            signatures_only: false,
            dirs_only: false,
            excludes: Vec::new(),
            signer: None,
            keyring: None,
            manifest_name: MANIFEST_NAME.to_string(),
        }
    }
}

/// Defaults loadable from a TOML config file.
///
/// CLI flags always win; file values fill in what the command line left
/// unset, and file excludes are appended to CLI excludes.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub exclude: Vec<String>,
    pub signer: Option<String>,
    pub keyring: Option<PathBuf>,
    pub manifest_name: Option<String>,
}

impl FileConfig {
    pub fn load(path: &PathBuf) -> Result<Self, SealError> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| SealError::ConfigError(format!("Invalid config file {}: {}", path.display(), e)))
    }
}

impl RunConfig {
    /// Fill unset fields from a config file's defaults.
    pub fn with_file_defaults(mut self, file: FileConfig) -> Self {
        self.excludes.extend(file.exclude);
        if self.signer.is_none() {
            self.signer = file.signer;
        }
        if self.keyring.is_none() {
            self.keyring = file.keyring;
        }
        if self.manifest_name == MANIFEST_NAME {
            if let Some(name) = file.manifest_name {
                self.manifest_name = name;
            }
        }
        self
    }

    /// Fall back to the environment for the keyring location.
    pub fn with_env_defaults(mut self) -> Self {
        if self.keyring.is_none() {
            if let Some(dir) = std::env::var_os(KEYRING_ENV) {
                self.keyring = Some(PathBuf::from(dir));
            }
        }
        self
    }
}
