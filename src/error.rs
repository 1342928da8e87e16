//! Error types for the dirseal manifest system.

use std::path::PathBuf;
use thiserror::Error;

/// Trust-layer errors: keyring access and signature handling.
#[derive(Debug, Error)]
pub enum TrustError {
    #[error("No signing key matches selector {0:?}")]
    NoSigningKey(String),

    #[error("Malformed key file {path}: {reason}")]
    MalformedKey { path: PathBuf, reason: String },

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Keyring I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors raised while computing, persisting, or comparing manifests.
#[derive(Debug, Error)]
pub enum SealError {
    #[error("Checksum entries for {dir} are not sorted; refusing to diff")]
    UnsortedChecksums { dir: PathBuf },

    #[error("Manifest for {dir} is not valid UTF-8")]
    ManifestNotUtf8 { dir: PathBuf },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Trust error: {0}")]
    Trust(#[from] TrustError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
