//! SHA-256 digest computation for manifest entries.
//!
//! All digests are lowercase hex. Files are hashed in fixed-size chunks so
//! large files never have to fit in memory; symbolic links are hashed by the
//! path string they point to, never by the content behind them.

use crate::types::Digest;
use sha2::{Digest as _, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the hex digest of a byte slice.
pub fn digest_bytes(data: &[u8]) -> Digest {
    hex::encode(Sha256::digest(data))
}

/// Compute the hex digest of a reader's content, chunk by chunk.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<Digest> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compute the hex digest of a regular file's content.
pub fn digest_file(path: &Path) -> io::Result<Digest> {
    digest_reader(File::open(path)?)
}

/// Compute the hex digest of a symbolic link's target path string.
pub fn digest_link_target(path: &Path) -> io::Result<Digest> {
    let target = std::fs::read_link(path)?;
    Ok(digest_bytes(target.to_string_lossy().as_bytes()))
}
