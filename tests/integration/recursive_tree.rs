//! Recursive attestation: bottom-up manifest writes and exclusion semantics.

use dirseal::config::RunConfig;
use dirseal::hasher;
use dirseal::roots::RootSet;
use dirseal::state::DirectoryState;
use dirseal::trust::NullPolicy;
use dirseal::types::{DIGEST_UNCHECKED, MANIFEST_NAME};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn recursive_config(excludes: &[&str]) -> RunConfig {
    RunConfig {
        recursive: true,
        excludes: excludes.iter().map(|s| s.to_string()).collect(),
        ..RunConfig::default()
    }
}

fn create_all(root: &Path, config: &RunConfig) {
    let set = RootSet::new(vec![root.to_path_buf()], config.clone());
    for state in set.directories().unwrap() {
        state.write(&NullPolicy).unwrap();
    }
}

#[test]
fn test_child_manifest_written_before_parent() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("sub").join("file.txt"), "payload").unwrap();

    let set = RootSet::new(vec![root.to_path_buf()], recursive_config(&[]));
    let order: Vec<_> = set
        .directories()
        .unwrap()
        .map(|s| s.path().to_path_buf())
        .collect();
    assert_eq!(order, vec![root.join("sub"), root.to_path_buf()]);
}

#[test]
fn test_parent_entry_is_hash_of_child_manifest_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("sub").join("file.txt"), "payload").unwrap();

    create_all(root, &recursive_config(&[]));

    let child_manifest = fs::read(root.join("sub").join(MANIFEST_NAME)).unwrap();
    let root_state = DirectoryState::new(root.to_path_buf(), MANIFEST_NAME);
    let live = root_state.live_checksums().unwrap();

    assert_eq!(
        live.digest_of("sub"),
        Some(hasher::digest_bytes(&child_manifest).as_str())
    );
}

#[test]
fn test_excluded_subdirectory_reports_unchecked_sentinel() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("sub").join("file.txt"), "payload").unwrap();
    fs::write(root.join("top.txt"), "top").unwrap();

    create_all(root, &recursive_config(&["sub"]));

    // The excluded subtree never received a manifest.
    assert!(!root.join("sub").join(MANIFEST_NAME).exists());

    let root_state = DirectoryState::new(root.to_path_buf(), MANIFEST_NAME);
    let live = root_state.live_checksums().unwrap();
    assert_eq!(live.digest_of("sub"), Some(DIGEST_UNCHECKED));
}

#[test]
fn test_empty_leaf_directories_receive_no_manifest() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir(root.join("empty")).unwrap();
    fs::write(root.join("file.txt"), "x").unwrap();

    create_all(root, &recursive_config(&[]));

    assert!(!root.join("empty").join(MANIFEST_NAME).exists());
    assert!(root.join(MANIFEST_NAME).exists());
}
