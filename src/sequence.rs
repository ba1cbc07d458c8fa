//! Ordered migration sequence
//!
//! Imposes a total order and bidirectional navigability over an unordered
//! batch of migration records. The sequence is built exactly once per source
//! open and never mutated afterwards, so a migration engine interleaving
//! `next`/`prev` calls with directional reads sees one consistent view for
//! the lifetime of the run.

use std::collections::BTreeMap;
use std::ops::Bound;

use thiserror::Error;

use crate::record::{Direction, MigrationRecord, Version};

/// Error returned when two records collide on the same (version, direction)
/// pair during construction. The sequence is never left partially built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("duplicate migration for version {version} ({direction})")]
pub struct DuplicateMigration {
    pub version: Version,
    pub direction: Direction,
}

/// Up/down record pair for one version.
#[derive(Debug, Default)]
struct VersionSlots {
    up: Option<MigrationRecord>,
    down: Option<MigrationRecord>,
}

/// Immutable, version-sorted view over a batch of migration records.
///
/// The version index is an ordered map keyed by version, computed once at
/// construction; every navigation call is a pure read against it, so a built
/// sequence may be shared across threads without locking.
#[derive(Debug, Default)]
pub struct MigrationSequence {
    slots: BTreeMap<Version, VersionSlots>,
}

impl MigrationSequence {
    /// Build a sequence from a batch of records.
    ///
    /// Each record is attached to the up- or down-slot of its version,
    /// creating the version entry if absent. A second record for an already
    /// occupied (version, direction) slot fails the whole construction with
    /// [`DuplicateMigration`].
    pub fn build(
        records: impl IntoIterator<Item = MigrationRecord>,
    ) -> Result<Self, DuplicateMigration> {
        let mut slots: BTreeMap<Version, VersionSlots> = BTreeMap::new();

        for record in records {
            let entry = slots.entry(record.version).or_default();
            let slot = match record.direction {
                Direction::Up => &mut entry.up,
                Direction::Down => &mut entry.down,
            };
            if slot.is_some() {
                return Err(DuplicateMigration {
                    version: record.version,
                    direction: record.direction,
                });
            }
            *slot = Some(record);
        }

        Ok(Self { slots })
    }

    /// Smallest version present. `None` when the sequence is empty.
    pub fn first(&self) -> Option<Version> {
        self.slots.keys().next().copied()
    }

    /// Largest recorded version strictly less than `version`.
    ///
    /// `version` itself need not be present: adjacency is computed from
    /// where it would sit in the order. This lets a host probe from an
    /// externally tracked current version that has no local record.
    pub fn prev(&self, version: Version) -> Option<Version> {
        self.slots.range(..version).next_back().map(|(v, _)| *v)
    }

    /// Smallest recorded version strictly greater than `version`.
    ///
    /// Like [`prev`](Self::prev), `version` may be a probe value with no
    /// record of its own.
    pub fn next(&self, version: Version) -> Option<Version> {
        self.slots
            .range((Bound::Excluded(version), Bound::Unbounded))
            .next()
            .map(|(v, _)| *v)
    }

    /// The up record for `version`, if one exists.
    ///
    /// Fails independently of [`down`](Self::down): a version holding only a
    /// down record has no up content, and vice versa.
    pub fn up(&self, version: Version) -> Option<&MigrationRecord> {
        self.slots.get(&version).and_then(|s| s.up.as_ref())
    }

    /// The down record for `version`, if one exists.
    pub fn down(&self, version: Version) -> Option<&MigrationRecord> {
        self.slots.get(&version).and_then(|s| s.down.as_ref())
    }

    /// Number of distinct versions.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All versions in ascending order.
    pub fn versions(&self) -> impl Iterator<Item = Version> + '_ {
        self.slots.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sparse_sequence() -> MigrationSequence {
        MigrationSequence::build(vec![
            MigrationRecord::up(1, "init", "CREATE TABLE a"),
            MigrationRecord::up(3, "add_b", "ALTER TABLE a ADD b"),
            MigrationRecord::down(3, "add_b", "ALTER TABLE a DROP b"),
            MigrationRecord::up(7, "add_c", "ALTER TABLE a ADD c"),
        ])
        .expect("no duplicates")
    }

    #[test]
    fn test_empty_sequence() {
        let seq = MigrationSequence::build(vec![]).expect("empty batch is valid");
        assert!(seq.is_empty());
        assert_eq!(seq.len(), 0);
        assert_eq!(seq.first(), None);
        assert_eq!(seq.prev(5), None);
        assert_eq!(seq.next(5), None);
        assert_eq!(seq.up(5), None);
    }

    #[test]
    fn test_first_is_smallest_version() {
        assert_eq!(sparse_sequence().first(), Some(1));
    }

    #[test]
    fn test_adjacent_pairs_navigate_both_ways() {
        let seq = sparse_sequence();
        let versions: Vec<Version> = seq.versions().collect();
        assert_eq!(versions, vec![1, 3, 7]);
        for pair in versions.windows(2) {
            assert_eq!(seq.next(pair[0]), Some(pair[1]));
            assert_eq!(seq.prev(pair[1]), Some(pair[0]));
        }
    }

    #[test]
    fn test_navigation_fails_past_boundaries() {
        let seq = sparse_sequence();
        assert_eq!(seq.prev(1), None);
        assert_eq!(seq.next(7), None);
    }

    #[test]
    fn test_probe_version_without_record() {
        // Adjacency is relative to where the probe would sit, so a version
        // tracked outside this source still navigates.
        let seq = sparse_sequence();
        assert_eq!(seq.prev(2), Some(1));
        assert_eq!(seq.next(2), Some(3));
        assert_eq!(seq.prev(100), Some(7));
        assert_eq!(seq.next(0), Some(1));
    }

    #[test]
    fn test_directional_slots_fail_independently() {
        let seq = sparse_sequence();
        // Version 1 is irreversible: up only
        assert!(seq.up(1).is_some());
        assert!(seq.down(1).is_none());
        // Version 3 has both
        assert!(seq.up(3).is_some());
        assert!(seq.down(3).is_some());
    }

    #[test]
    fn test_up_returns_exact_content() {
        let seq = sparse_sequence();
        let record = seq.up(3).expect("up record for 3");
        assert_eq!(record.raw, "ALTER TABLE a ADD b");
        assert_eq!(record.identifier, "add_b");
        let record = seq.down(3).expect("down record for 3");
        assert_eq!(record.raw, "ALTER TABLE a DROP b");
    }

    #[test]
    fn test_down_only_version() {
        let seq = MigrationSequence::build(vec![MigrationRecord::down(4, "undo", "DROP TABLE a")])
            .expect("build");
        assert!(seq.up(4).is_none());
        assert_eq!(seq.down(4).expect("down record").identifier, "undo");
        assert_eq!(seq.first(), Some(4));
    }

    #[test]
    fn test_duplicate_up_fails_construction() {
        let err = MigrationSequence::build(vec![
            MigrationRecord::up(5, "a", "x"),
            MigrationRecord::up(5, "b", "y"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            DuplicateMigration {
                version: 5,
                direction: Direction::Up,
            }
        );
    }

    #[test]
    fn test_duplicate_down_fails_construction() {
        let err = MigrationSequence::build(vec![
            MigrationRecord::up(5, "a", "x"),
            MigrationRecord::down(5, "a", "y"),
            MigrationRecord::down(5, "b", "z"),
        ])
        .unwrap_err();
        assert_eq!(err.version, 5);
        assert_eq!(err.direction, Direction::Down);
    }

    #[test]
    fn test_duplicate_error_display() {
        let err = DuplicateMigration {
            version: 5,
            direction: Direction::Up,
        };
        assert_eq!(err.to_string(), "duplicate migration for version 5 (up)");
    }

    #[test]
    fn test_ordering_stable_across_queries() {
        let seq = sparse_sequence();
        for _ in 0..3 {
            assert_eq!(seq.first(), Some(1));
            assert_eq!(seq.next(1), Some(3));
            assert_eq!(seq.prev(3), Some(1));
        }
    }

    #[test]
    fn test_unordered_batch_is_sorted() {
        let seq = MigrationSequence::build(vec![
            MigrationRecord::up(30, "c", ""),
            MigrationRecord::up(10, "a", ""),
            MigrationRecord::up(20, "b", ""),
        ])
        .expect("build");
        assert_eq!(seq.versions().collect::<Vec<_>>(), vec![10, 20, 30]);
    }

    proptest! {
        #[test]
        fn prop_navigation_agrees_with_sorted_versions(
            versions in prop::collection::btree_set(0u64..1_000, 0..40),
        ) {
            let seq = MigrationSequence::build(
                versions.iter().map(|&v| MigrationRecord::up(v, format!("m{v}"), "SELECT 1")),
            )
            .expect("distinct versions cannot collide");

            let sorted: Vec<Version> = versions.iter().copied().collect();
            prop_assert_eq!(seq.first(), sorted.first().copied());
            prop_assert_eq!(seq.len(), sorted.len());

            for pair in sorted.windows(2) {
                prop_assert_eq!(seq.next(pair[0]), Some(pair[1]));
                prop_assert_eq!(seq.prev(pair[1]), Some(pair[0]));
            }
            if let Some(&first) = sorted.first() {
                prop_assert_eq!(seq.prev(first), None);
            }
            if let Some(&last) = sorted.last() {
                prop_assert_eq!(seq.next(last), None);
            }
        }

        #[test]
        fn prop_probe_navigation_matches_linear_scan(
            versions in prop::collection::btree_set(0u64..1_000, 0..40),
            probe in 0u64..1_000,
        ) {
            let seq = MigrationSequence::build(
                versions.iter().map(|&v| MigrationRecord::up(v, format!("m{v}"), "")),
            )
            .expect("distinct versions cannot collide");

            let expected_prev = versions.iter().copied().filter(|&v| v < probe).max();
            let expected_next = versions.iter().copied().filter(|&v| v > probe).min();
            prop_assert_eq!(seq.prev(probe), expected_prev);
            prop_assert_eq!(seq.next(probe), expected_next);
        }
    }
}
