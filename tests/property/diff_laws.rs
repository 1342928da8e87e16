//! Property-based tests for the checksum set and its diff laws.

use dirseal::checksum::{ChecksumSet, Entry};
use dirseal::events::{ChangeEvent, Report};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

/// Entry names that survive the manifest format: no newlines and no
/// two-consecutive-space runs (the documented parsing limitation).
fn name_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9._-]{1,12}"
}

fn digest_strategy() -> impl Strategy<Value = String> {
    "[0-9a-f]{64}"
}

/// A map gives us unique names for free; sets are built sorted.
fn set_strategy() -> impl Strategy<Value = ChecksumSet> {
    prop::collection::btree_map(name_strategy(), digest_strategy(), 0..16).prop_map(to_set)
}

fn to_set(map: BTreeMap<String, String>) -> ChecksumSet {
    ChecksumSet::from_entries(
        map.into_iter()
            .map(|(name, digest)| Entry { name, digest })
            .collect(),
    )
}

fn run_diff(expected: &ChecksumSet, actual: &ChecksumSet) -> Vec<ChangeEvent> {
    let mut report = Report::new();
    ChecksumSet::diff(expected, actual, Path::new("/p"), &mut report).unwrap();
    report.events().to_vec()
}

proptest! {
    #[test]
    fn prop_manifest_text_round_trips(set in set_strategy()) {
        let parsed = ChecksumSet::from_manifest_text(&set.to_manifest_text());
        prop_assert_eq!(parsed, set);
    }

    #[test]
    fn prop_self_diff_is_single_unchanged_event(set in set_strategy()) {
        let events = run_diff(&set, &set.clone());
        prop_assert_eq!(events.len(), 1);
        let is_unchanged = matches!(events[0], ChangeEvent::DirectoryUnchanged { .. });
        prop_assert!(is_unchanged);
    }

    #[test]
    fn prop_disjoint_sets_produce_only_removed_and_added(
        left in prop::collection::btree_map(name_strategy(), digest_strategy(), 1..12),
        right in prop::collection::btree_map(name_strategy(), digest_strategy(), 1..12),
    ) {
        // Make the name sets disjoint by prefixing each side.
        let expected = to_set(left.iter().map(|(n, d)| (format!("l_{}", n), d.clone())).collect());
        let actual = to_set(right.iter().map(|(n, d)| (format!("r_{}", n), d.clone())).collect());

        let events = run_diff(&expected, &actual);
        let is_changed = matches!(events[0], ChangeEvent::DirectoryChanged { .. });
        prop_assert!(is_changed);

        let removed: Vec<_> = events.iter().filter_map(|e| match e {
            ChangeEvent::ItemRemoved { name, .. } => Some(name.clone()),
            _ => None,
        }).collect();
        let added: Vec<_> = events.iter().filter_map(|e| match e {
            ChangeEvent::ItemAdded { name, .. } => Some(name.clone()),
            _ => None,
        }).collect();

        prop_assert_eq!(removed.len(), expected.len());
        prop_assert_eq!(added.len(), actual.len());
        prop_assert_eq!(events.len(), 1 + expected.len() + actual.len());

        // Each stream arrives in name order.
        prop_assert!(removed.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(added.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn prop_shared_names_with_different_digests_emit_one_change_each(
        names in prop::collection::btree_set(name_strategy(), 1..12),
    ) {
        let expected = to_set(names.iter().map(|n| (n.clone(), "0".repeat(64))).collect());
        let actual = to_set(names.iter().map(|n| (n.clone(), "f".repeat(64))).collect());

        let events = run_diff(&expected, &actual);
        let changed: Vec<_> = events.iter().filter_map(|e| match e {
            ChangeEvent::ItemChanged { name, expected, actual, .. } => {
                Some((name.clone(), expected.clone(), actual.clone()))
            }
            _ => None,
        }).collect();

        prop_assert_eq!(changed.len(), names.len());
        let all_zero = "0".repeat(64);
        let all_f = "f".repeat(64);
        for (_, exp, act) in &changed {
            prop_assert_eq!(exp.as_str(), all_zero.as_str());
            prop_assert_eq!(act.as_str(), all_f.as_str());
        }
    }

    #[test]
    fn prop_diff_event_count_bounded_by_union(
        left in set_strategy(),
        right in set_strategy(),
    ) {
        let events = run_diff(&left, &right);
        // One directory event plus at most one event per union name.
        prop_assert!(events.len() <= 1 + left.len() + right.len());
    }
}
