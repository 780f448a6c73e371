//! The persisted snapshot row

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use oaistore_core::{IndexStatus, NetworkRef, SnapshotId, SnapshotMeta, SnapshotStatus};

/// One snapshot's lifecycle metadata
///
/// Serialized as `snapshots/snapshot_{id}/metadata.json`. A freshly
/// created snapshot has no status yet; `start_harvesting` assigns the
/// first one. Counter invariants (`valid_size <= size`,
/// `transformed_size <= size`, all non-negative) are enforced by the
/// store's mutation methods, not by this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRow {
    /// Snapshot id, monotone and unique within the store
    pub id: SnapshotId,
    /// Owning network (flattened reference)
    pub network: NetworkRef,
    /// Back-link for incremental harvests
    pub previous_snapshot_id: Option<SnapshotId>,
    /// Lifecycle status (`None` until the first transition)
    pub status: Option<SnapshotStatus>,
    /// Full-text index status
    pub index_status: IndexStatus,
    /// When the snapshot (or its harvest) started
    pub start_time: DateTime<Utc>,
    /// Last phase-boundary checkpoint
    pub end_time: Option<DateTime<Utc>>,
    /// When this snapshot last seeded an incremental harvest
    pub last_incremental_time: Option<DateTime<Utc>>,
    /// Records written to the catalog
    pub size: u64,
    /// Records currently counted valid
    pub valid_size: u64,
    /// Records currently counted transformed
    pub transformed_size: u64,
    /// Logical tombstone
    pub deleted: bool,
}

impl SnapshotRow {
    /// Create the row inserted by `create_snapshot`
    pub fn new(id: SnapshotId, network: NetworkRef) -> Self {
        SnapshotRow {
            id,
            network,
            previous_snapshot_id: None,
            status: None,
            index_status: IndexStatus::Unknown,
            start_time: Utc::now(),
            end_time: None,
            last_incremental_time: None,
            size: 0,
            valid_size: 0,
            transformed_size: 0,
            deleted: false,
        }
    }

    /// Handle carrying the id and network of this row
    pub fn meta(&self) -> SnapshotMeta {
        SnapshotMeta::new(self.id, self.network.clone())
    }

    /// Whether the counters satisfy their documented invariants
    pub fn counters_consistent(&self) -> bool {
        self.valid_size <= self.size && self.transformed_size <= self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_row_has_no_status() {
        let row = SnapshotRow::new(7, NetworkRef::new(1, "net"));
        assert!(row.status.is_none());
        assert_eq!(row.index_status, IndexStatus::Unknown);
        assert_eq!(row.size, 0);
        assert!(!row.deleted);
        assert!(row.counters_consistent());
    }

    #[test]
    fn test_row_round_trips_through_json() {
        let mut row = SnapshotRow::new(7, NetworkRef::new(1, "net"));
        row.status = Some(SnapshotStatus::Valid);
        row.size = 10;
        row.valid_size = 4;
        row.end_time = Some(Utc::now());

        let json = serde_json::to_string_pretty(&row).unwrap();
        let back: SnapshotRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }
}
