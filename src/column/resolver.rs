//! Memoizing name → ordinal resolver

use std::collections::HashMap;
use std::sync::Arc;

use crate::source::RowReader;

/// Case folding shared by every name lookup in the crate
pub(crate) fn normalize(name: &str) -> String {
    name.to_lowercase()
}

/// Immutable export of a resolved row shape.
///
/// Cloning is cheap; the map is shared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSnapshot {
    ordinals: Arc<HashMap<String, usize>>,
    field_count: usize,
}

impl ColumnSnapshot {
    /// Ordinal of a column, case-insensitive
    pub fn get(&self, name: &str) -> Option<usize> {
        self.ordinals.get(&normalize(name)).copied()
    }

    /// Number of distinct column names
    pub fn len(&self) -> usize {
        self.ordinals.len()
    }

    /// Returns true if nothing was resolved
    pub fn is_empty(&self) -> bool {
        self.ordinals.is_empty()
    }

    /// Field count of the shape the snapshot was taken from
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    /// Normalized names ordered by ordinal
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<(&str, usize)> = self
            .ordinals
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        names.sort_by_key(|(_, ordinal)| *ordinal);
        names.into_iter().map(|(k, _)| k).collect()
    }
}

/// Per-execution column resolver.
///
/// An unseeded index scans the row shape on the first `resolve` call. A
/// seeded index reuses a snapshot and skips the scan, unless the first row it
/// sees has a different field count, in which case the seed is dropped before
/// any name was handed out and the shape is scanned normally.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    ordinals: HashMap<String, usize>,
    field_count: usize,
    scanned: bool,
    seeded: bool,
    verified: bool,
}

impl ColumnIndex {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an independent resolver pre-seeded from an export
    pub fn from_snapshot(snapshot: &ColumnSnapshot) -> Self {
        Self {
            ordinals: (*snapshot.ordinals).clone(),
            field_count: snapshot.field_count,
            scanned: true,
            seeded: true,
            verified: false,
        }
    }

    /// Whether this resolver started from a snapshot
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Record the reader's row shape without resolving a name.
    ///
    /// Verifies a seed on first use and scans an unseeded index once.
    pub fn observe(&mut self, reader: &dyn RowReader) {
        if self.seeded && !self.verified {
            self.verified = true;
            if reader.field_count() != self.field_count {
                self.ordinals.clear();
                self.scanned = false;
            }
        }
        if !self.scanned {
            self.scan(reader);
        }
    }

    /// Resolve a column name against the reader's current shape
    pub fn resolve(&mut self, reader: &dyn RowReader, name: &str) -> Option<usize> {
        self.observe(reader);
        self.ordinals.get(&normalize(name)).copied()
    }

    fn scan(&mut self, reader: &dyn RowReader) {
        self.field_count = reader.field_count();
        for ordinal in 0..self.field_count {
            if let Some(name) = reader.field_name(ordinal) {
                // first occurrence wins for duplicate names
                self.ordinals.entry(normalize(name)).or_insert(ordinal);
            }
        }
        self.scanned = true;
    }

    /// Export an immutable snapshot of everything resolved so far
    pub fn export(&self) -> ColumnSnapshot {
        ColumnSnapshot {
            ordinals: Arc::new(self.ordinals.clone()),
            field_count: self.field_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemoryRowSource, RowSource};
    use crate::value::SqlValue;

    fn reader(columns: &[&str]) -> MemoryRowSource {
        let row = columns.iter().map(|_| SqlValue::Int(0)).collect();
        let mut src = MemoryRowSource::new(columns.iter().copied(), vec![row]);
        src.advance().unwrap();
        src
    }

    #[test]
    fn test_case_insensitive() {
        let src = reader(&["Id", "Full_Name"]);
        let mut index = ColumnIndex::new();
        assert_eq!(index.resolve(&src, "id"), Some(0));
        assert_eq!(index.resolve(&src, "FULL_NAME"), Some(1));
    }

    #[test]
    fn test_miss_is_none() {
        let src = reader(&["a"]);
        let mut index = ColumnIndex::new();
        assert_eq!(index.resolve(&src, "missing"), None);
        assert_eq!(index.resolve(&src, "missing"), None);
    }

    #[test]
    fn test_duplicate_first_wins() {
        let src = reader(&["x", "X"]);
        let mut index = ColumnIndex::new();
        assert_eq!(index.resolve(&src, "x"), Some(0));
    }

    #[test]
    fn test_export_and_seed() {
        let src = reader(&["a", "b"]);
        let mut index = ColumnIndex::new();
        index.resolve(&src, "a");
        let snapshot = index.export();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.names(), vec!["a", "b"]);

        let mut seeded = ColumnIndex::from_snapshot(&snapshot);
        assert!(seeded.is_seeded());
        assert_eq!(seeded.resolve(&src, "B"), Some(1));
    }

    #[test]
    fn test_stale_seed_rescans() {
        let snapshot = {
            let src = reader(&["a", "b"]);
            let mut index = ColumnIndex::new();
            index.resolve(&src, "a");
            index.export()
        };

        let src = reader(&["c", "b", "a"]);
        let mut seeded = ColumnIndex::from_snapshot(&snapshot);
        assert_eq!(seeded.resolve(&src, "a"), Some(2));
        assert_eq!(seeded.resolve(&src, "c"), Some(0));
    }

    #[test]
    fn test_observe_scans_once() {
        let src = reader(&["a", "b"]);
        let mut index = ColumnIndex::new();
        index.observe(&src);
        assert_eq!(index.export().field_count(), 2);
        assert_eq!(index.resolve(&src, "b"), Some(1));
    }

    #[test]
    fn test_snapshot_unaffected_by_later_copies() {
        let src = reader(&["a"]);
        let mut index = ColumnIndex::new();
        index.resolve(&src, "a");
        let snapshot = index.export();
        let copy = ColumnIndex::from_snapshot(&snapshot);
        drop(copy);
        assert_eq!(snapshot.get("A"), Some(0));
    }
}
