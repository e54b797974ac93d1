//! Core types for reconciliation bookkeeping

use serde::{Deserialize, Serialize};

/// Outcome of reconciling a single resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// No changes needed
    Unchanged,
    /// Resource was created
    Created,
    /// Resource was modified in place
    Updated,
    /// Resource was hard-deleted
    Deleted,
    /// Resource was moved one position
    Moved,
    /// Resource was left alone (unmanaged or retained)
    Skipped,
}

/// Summary of reconciliation results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub moved: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl ReconcileSummary {
    /// Total number of remote writes
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.deleted + self.moved
    }

    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ReconcileSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.moved += other.moved;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
    }

    /// Count one outcome
    pub fn record(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Unchanged => self.unchanged += 1,
            ChangeKind::Created => self.created += 1,
            ChangeKind::Updated => self.updated += 1,
            ChangeKind::Deleted => self.deleted += 1,
            ChangeKind::Moved => self.moved += 1,
            ChangeKind::Skipped => self.skipped += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_only_writes_as_changes() {
        let mut summary = ReconcileSummary::default();
        summary.record(ChangeKind::Unchanged);
        summary.record(ChangeKind::Skipped);
        assert!(!summary.has_changes());

        summary.record(ChangeKind::Moved);
        summary.record(ChangeKind::Created);
        assert_eq!(summary.total_changes(), 2);
    }

    #[test]
    fn test_merge() {
        let mut a = ReconcileSummary {
            created: 1,
            ..Default::default()
        };
        let b = ReconcileSummary {
            created: 2,
            deleted: 1,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.created, 3);
        assert_eq!(a.deleted, 1);
    }
}
