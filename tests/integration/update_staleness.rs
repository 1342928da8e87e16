//! Incremental update: staleness detection and upward propagation.

use dirseal::config::RunConfig;
use dirseal::roots::RootSet;
use dirseal::state::DirectoryState;
use dirseal::trust::NullPolicy;
use dirseal::types::MANIFEST_NAME;
use filetime::FileTime;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn recursive_config() -> RunConfig {
    RunConfig {
        recursive: true,
        ..RunConfig::default()
    }
}

fn create_all(root: &Path) {
    let set = RootSet::new(vec![root.to_path_buf()], recursive_config());
    for state in set.directories().unwrap() {
        state.write(&NullPolicy).unwrap();
    }
}

/// Re-run an update pass: rewrite only stale directories, in bottom-up order.
fn update_all(root: &Path) -> Vec<std::path::PathBuf> {
    let set = RootSet::new(vec![root.to_path_buf()], recursive_config());
    let mut rewritten = Vec::new();
    for state in set.directories().unwrap() {
        if state.needs_update().unwrap() {
            state.write(&NullPolicy).unwrap();
            rewritten.push(state.path().to_path_buf());
        }
    }
    rewritten
}

/// Backdate a path's mtime so later writes register as strictly newer.
fn backdate(path: &Path) {
    filetime::set_file_mtime(path, FileTime::from_unix_time(1_000_000_000, 0)).unwrap();
}

#[test]
fn test_update_skips_current_directories() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("a.txt"), "x").unwrap();
    create_all(root);

    assert!(update_all(root).is_empty());
}

#[test]
fn test_touched_file_marks_directory_stale() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let file = root.join("a.txt");
    fs::write(&file, "x").unwrap();
    create_all(root);

    let future = FileTime::from_unix_time(FileTime::now().unix_seconds() + 60, 0);
    filetime::set_file_mtime(&file, future).unwrap();

    assert_eq!(update_all(root), vec![root.to_path_buf()]);
}

#[test]
fn test_child_update_propagates_staleness_to_parent() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir(root.join("sub")).unwrap();
    let file = root.join("sub").join("file.txt");
    fs::write(&file, "v1").unwrap();
    fs::write(root.join("top.txt"), "t").unwrap();
    create_all(root);

    // Age the attested state, then change only the nested file.
    backdate(&root.join("sub").join(MANIFEST_NAME));
    backdate(&root.join("sub"));
    backdate(&root.join(MANIFEST_NAME));
    backdate(&root.join("top.txt"));
    fs::write(&file, "v2").unwrap();

    let rewritten = update_all(root);

    // The child was rewritten first; its mtime bump made the parent stale
    // within the same pass.
    assert_eq!(rewritten, vec![root.join("sub"), root.to_path_buf()]);

    // The parent's entry for the child now matches the fresh child manifest.
    let child_manifest = fs::read(root.join("sub").join(MANIFEST_NAME)).unwrap();
    let live = DirectoryState::new(root.to_path_buf(), MANIFEST_NAME)
        .live_checksums()
        .unwrap();
    assert_eq!(
        live.digest_of("sub"),
        Some(dirseal::hasher::digest_bytes(&child_manifest).as_str())
    );
}

#[test]
fn test_unrelated_sibling_not_rewritten() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir(root.join("hot")).unwrap();
    fs::create_dir(root.join("cold")).unwrap();
    let hot_file = root.join("hot").join("file.txt");
    fs::write(&hot_file, "v1").unwrap();
    fs::write(root.join("cold").join("file.txt"), "c").unwrap();
    create_all(root);

    backdate(&root.join("hot").join(MANIFEST_NAME));
    backdate(&root.join("hot"));
    backdate(&root.join(MANIFEST_NAME));
    fs::write(&hot_file, "v2").unwrap();

    let rewritten = update_all(root);
    assert!(rewritten.contains(&root.join("hot")));
    assert!(!rewritten.contains(&root.join("cold")));
}
