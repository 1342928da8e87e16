//! Dirseal: tamper detection for directory trees.
//!
//! Maintains, per directory, a signed manifest of its immediate children's
//! content hashes; directories reference each other through hash-of-manifest
//! entries, forming a lazily maintained Merkle structure over the filesystem.

pub mod checksum;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod hasher;
pub mod logging;
pub mod roots;
pub mod scanner;
pub mod state;
pub mod trust;
pub mod types;
