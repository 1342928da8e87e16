//! Core type definitions for the dirseal manifest system.

/// Hex-encoded SHA-256 digest of an entry's content.
///
/// Real digests are always 64 lowercase hex characters, which keeps them
/// disjoint from the two sentinel values below.
pub type Digest = String;

/// Sentinel digest for a subdirectory that has no manifest (unchecked).
pub const DIGEST_UNCHECKED: &str = "";

/// Sentinel digest for an entry kind we do not hash (device, socket, fifo).
pub const DIGEST_UNSUPPORTED: &str = "-";

/// Default filename of the per-directory manifest.
pub const MANIFEST_NAME: &str = ".dirseal";
