//! The snapshot store
//!
//! State machine transitions:
//!
//! | From | Event | To | Side effects |
//! |---|---|---|---|
//! | — | `create_snapshot` | (no status) | row inserted, `start_time = now` |
//! | any | `start_harvesting` | HARVESTING | `start_time = now` |
//! | HARVESTING | `update_harvesting` | HARVESTING | `end_time = now` (checkpoint) |
//! | HARVESTING | `finish_harvesting` | HARVESTING_FINISHED_VALID | `end_time = now` |
//! | HARVESTING_FINISHED_VALID | `start_validation` | VALID | — |
//! | VALID | `finish_validation` | VALID | `end_time = now` |
//! | VALID | `mark_as_indexed` | VALID, index INDEXED | — |
//! | any | `mark_as_failed` | HARVESTING_FINISHED_ERROR | `end_time = now` |
//! | any | `mark_as_retrying` | RETRYING | — |
//! | any | `mark_as_deleted` | (unchanged), `deleted = true` | — |
//!
//! An illegal transition logs the attempt, mutates nothing, and surfaces a
//! `StateError`. The legacy `update_snapshot_status` setter enforces the
//! same table.
//!
//! Mutations against one snapshot are serialized through its entry mutex.
//! Dirty rows persist after [`AUTOFLUSH_UPDATES`] batched updates or at
//! phase boundaries; readers see either the pre- or post-mutation row,
//! never torn fields.

use std::fs;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use oaistore_core::{
    IndexStatus, NetworkRef, Result, SnapshotId, SnapshotMeta, SnapshotStatus, StoreConfig,
    StoreError, StorePaths,
};

use crate::row::SnapshotRow;

/// Dirty updates batched before an automatic persist
pub const AUTOFLUSH_UPDATES: usize = 100;

struct Entry {
    row: SnapshotRow,
    dirty: usize,
}

/// Outcome of `clean_snapshot_data`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanOutcome {
    /// The row was retained as a logical tombstone (`deleted = true`)
    Tombstoned,
    /// The row and its directory were physically removed
    Removed,
}

/// Authoritative store of snapshot lifecycle rows
pub struct SnapshotStore {
    paths: StorePaths,
    entries: DashMap<SnapshotId, Arc<Mutex<Entry>>>,
    next_id: AtomicI64,
}

impl SnapshotStore {
    /// Open the store, loading every persisted row under the base path
    ///
    /// Rows that fail to parse are skipped with a warning; the id counter
    /// seeds past the highest id seen.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let paths = StorePaths::new(&config.base_path);
        fs::create_dir_all(paths.base())?;

        let store = SnapshotStore {
            paths,
            entries: DashMap::new(),
            next_id: AtomicI64::new(1),
        };
        store.load_existing()?;
        Ok(store)
    }

    fn load_existing(&self) -> Result<()> {
        let mut max_id = 0;
        for network_dir in subdirectories(self.paths.base())? {
            let snapshots = network_dir.join("snapshots");
            if !snapshots.is_dir() {
                continue;
            }
            for snapshot_dir in subdirectories(&snapshots)? {
                let metadata = snapshot_dir.join("metadata.json");
                if !metadata.is_file() {
                    continue;
                }
                let content = fs::read_to_string(&metadata)?;
                match serde_json::from_str::<SnapshotRow>(&content) {
                    Ok(row) => {
                        max_id = max_id.max(row.id);
                        self.entries
                            .insert(row.id, Arc::new(Mutex::new(Entry { row, dirty: 0 })));
                    }
                    Err(e) => {
                        warn!(file = %metadata.display(), error = %e, "skipping unreadable snapshot row");
                    }
                }
            }
        }
        self.next_id.store(max_id + 1, Ordering::SeqCst);
        debug!(loaded = self.entries.len(), "loaded snapshot rows");
        Ok(())
    }

    /// Insert a new snapshot row for the network
    ///
    /// No status is assigned yet; `start_time` is now. The row persists
    /// immediately so the snapshot directory exists from creation on.
    pub fn create_snapshot(&self, network: &NetworkRef) -> Result<SnapshotId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = SnapshotRow::new(id, network.clone());
        self.persist_row(&row)?;
        self.entries
            .insert(id, Arc::new(Mutex::new(Entry { row, dirty: 0 })));
        info!(snapshot = id, network = network.network_id, "created snapshot");
        Ok(id)
    }

    fn entry(&self, id: SnapshotId) -> Result<Arc<Mutex<Entry>>> {
        self.entries
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or_else(|| StoreError::not_found(format!("snapshot {}", id)))
    }

    /// Apply a batched mutation (persisted after [`AUTOFLUSH_UPDATES`])
    fn mutate<R>(
        &self,
        id: SnapshotId,
        force_flush: bool,
        f: impl FnOnce(&mut SnapshotRow) -> Result<R>,
    ) -> Result<R> {
        let entry = self.entry(id)?;
        let mut entry = entry.lock();
        let result = f(&mut entry.row)?;
        entry.dirty += 1;
        if force_flush || entry.dirty >= AUTOFLUSH_UPDATES {
            self.persist_row(&entry.row)?;
            entry.dirty = 0;
        }
        Ok(result)
    }

    fn persist_row(&self, row: &SnapshotRow) -> Result<()> {
        let path = self.paths.snapshot_metadata_file(&row.network, row.id);
        let parent = path
            .parent()
            .ok_or_else(|| StoreError::store_io("snapshot path has no parent"))?;
        fs::create_dir_all(parent)?;
        let tmp = path.with_extension("json.inprogress");
        fs::write(&tmp, serde_json::to_string_pretty(row)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Persist the snapshot's row if dirty
    pub fn flush(&self, id: SnapshotId) -> Result<()> {
        let entry = self.entry(id)?;
        let mut entry = entry.lock();
        if entry.dirty > 0 {
            self.persist_row(&entry.row)?;
            entry.dirty = 0;
        }
        Ok(())
    }

    /// Persist every dirty row
    pub fn flush_all(&self) -> Result<()> {
        for item in self.entries.iter() {
            let mut entry = item.value().lock();
            if entry.dirty > 0 {
                self.persist_row(&entry.row)?;
                entry.dirty = 0;
            }
        }
        Ok(())
    }

    /// Read the snapshot's current row
    pub fn get(&self, id: SnapshotId) -> Result<SnapshotRow> {
        let entry = self.entry(id)?;
        let entry = entry.lock();
        Ok(entry.row.clone())
    }

    /// Id-and-network handle for the snapshot
    pub fn meta(&self, id: SnapshotId) -> Result<SnapshotMeta> {
        Ok(self.get(id)?.meta())
    }

    // =========================================================================
    // Phase transitions
    // =========================================================================

    fn check_transition(
        row: &SnapshotRow,
        target: SnapshotStatus,
        event: &'static str,
    ) -> Result<()> {
        if transition_allowed(row.status, target) {
            return Ok(());
        }
        warn!(
            snapshot = row.id,
            current = ?row.status,
            target = %target,
            event,
            "rejected illegal snapshot transition"
        );
        Err(StoreError::state(format!(
            "snapshot {}: {} not permitted from {:?}",
            row.id, event, row.status
        )))
    }

    /// Enter HARVESTING and restamp `start_time`
    pub fn start_harvesting(&self, id: SnapshotId) -> Result<()> {
        self.mutate(id, true, |row| {
            Self::check_transition(row, SnapshotStatus::Harvesting, "start_harvesting")?;
            row.status = Some(SnapshotStatus::Harvesting);
            row.start_time = Utc::now();
            Ok(())
        })
    }

    /// Checkpoint a running harvest (`end_time = now`)
    pub fn update_harvesting(&self, id: SnapshotId) -> Result<()> {
        self.mutate(id, false, |row| {
            if row.status != Some(SnapshotStatus::Harvesting) {
                return Err(StoreError::state(format!(
                    "snapshot {}: update_harvesting outside HARVESTING",
                    id
                )));
            }
            row.end_time = Some(Utc::now());
            Ok(())
        })
    }

    /// Close the harvest phase
    pub fn finish_harvesting(&self, id: SnapshotId) -> Result<()> {
        self.mutate(id, true, |row| {
            Self::check_transition(
                row,
                SnapshotStatus::HarvestingFinishedValid,
                "finish_harvesting",
            )?;
            row.status = Some(SnapshotStatus::HarvestingFinishedValid);
            row.end_time = Some(Utc::now());
            Ok(())
        })
    }

    /// Enter the validation working state (VALID)
    pub fn start_validation(&self, id: SnapshotId) -> Result<()> {
        self.mutate(id, true, |row| {
            Self::check_transition(row, SnapshotStatus::Valid, "start_validation")?;
            row.status = Some(SnapshotStatus::Valid);
            Ok(())
        })
    }

    /// Close the validation phase (`end_time = now`, status stays VALID)
    pub fn finish_validation(&self, id: SnapshotId) -> Result<()> {
        self.mutate(id, true, |row| {
            if row.status != Some(SnapshotStatus::Valid) {
                return Err(StoreError::state(format!(
                    "snapshot {}: finish_validation outside VALID",
                    id
                )));
            }
            row.end_time = Some(Utc::now());
            Ok(())
        })
    }

    /// Record that the full-text indexer consumed the snapshot
    pub fn mark_as_indexed(&self, id: SnapshotId) -> Result<()> {
        self.mutate(id, true, |row| {
            if row.status != Some(SnapshotStatus::Valid) {
                return Err(StoreError::state(format!(
                    "snapshot {}: mark_as_indexed outside VALID",
                    id
                )));
            }
            row.index_status = IndexStatus::Indexed;
            Ok(())
        })
    }

    /// Record a fatal harvest failure
    pub fn mark_as_failed(&self, id: SnapshotId) -> Result<()> {
        self.mutate(id, true, |row| {
            row.status = Some(SnapshotStatus::HarvestingFinishedError);
            row.end_time = Some(Utc::now());
            Ok(())
        })
    }

    /// Record that a failed harvest is being retried
    pub fn mark_as_retrying(&self, id: SnapshotId) -> Result<()> {
        self.mutate(id, true, |row| {
            row.status = Some(SnapshotStatus::Retrying);
            Ok(())
        })
    }

    /// Set the logical tombstone without touching the status
    pub fn mark_as_deleted(&self, id: SnapshotId) -> Result<()> {
        self.mutate(id, true, |row| {
            row.deleted = true;
            Ok(())
        })
    }

    /// Legacy status setter, kept for migration
    ///
    /// Enforces the same transition table as the phase-named API.
    pub fn update_snapshot_status(&self, id: SnapshotId, status: SnapshotStatus) -> Result<()> {
        self.mutate(id, true, |row| {
            Self::check_transition(row, status, "update_snapshot_status")?;
            row.status = Some(status);
            Ok(())
        })
    }

    // =========================================================================
    // Counters
    // =========================================================================

    /// Count one harvested record (HARVESTING only)
    pub fn increment_size(&self, id: SnapshotId) -> Result<()> {
        self.increment_snapshot_size_by(id, 1)
    }

    /// Count `n` harvested records (HARVESTING only)
    pub fn increment_snapshot_size_by(&self, id: SnapshotId, n: u64) -> Result<()> {
        self.mutate(id, false, |row| {
            if row.status != Some(SnapshotStatus::Harvesting) {
                return Err(StoreError::state(format!(
                    "snapshot {}: size only grows during HARVESTING",
                    id
                )));
            }
            row.size += n;
            Ok(())
        })
    }

    /// Count one record as valid (VALID phase; bounded by `size`)
    pub fn increment_valid_size(&self, id: SnapshotId) -> Result<()> {
        self.mutate(id, false, |row| {
            Self::check_validation_phase(row)?;
            if row.valid_size >= row.size {
                return Err(StoreError::state(format!(
                    "snapshot {}: valid_size cannot exceed size", id
                )));
            }
            row.valid_size += 1;
            Ok(())
        })
    }

    /// Uncount one valid record (floors at zero)
    pub fn decrement_valid_size(&self, id: SnapshotId) -> Result<()> {
        self.mutate(id, false, |row| {
            Self::check_validation_phase(row)?;
            row.valid_size = row.valid_size.saturating_sub(1);
            Ok(())
        })
    }

    /// Count one record as transformed (VALID phase; bounded by `size`)
    pub fn increment_transformed_size(&self, id: SnapshotId) -> Result<()> {
        self.mutate(id, false, |row| {
            Self::check_validation_phase(row)?;
            if row.transformed_size >= row.size {
                return Err(StoreError::state(format!(
                    "snapshot {}: transformed_size cannot exceed size", id
                )));
            }
            row.transformed_size += 1;
            Ok(())
        })
    }

    /// Uncount one transformed record (floors at zero)
    pub fn decrement_transformed_size(&self, id: SnapshotId) -> Result<()> {
        self.mutate(id, false, |row| {
            Self::check_validation_phase(row)?;
            row.transformed_size = row.transformed_size.saturating_sub(1);
            Ok(())
        })
    }

    fn check_validation_phase(row: &SnapshotRow) -> Result<()> {
        if row.status != Some(SnapshotStatus::Valid) {
            return Err(StoreError::state(format!(
                "snapshot {}: validation counters only move during VALID",
                row.id
            )));
        }
        Ok(())
    }

    /// Zero the validation counters and rewind to the pre-validation state
    ///
    /// Sets `valid_size = transformed_size = 0`, forces
    /// `status = HARVESTING_FINISHED_VALID`, and `index_status = UNKNOWN`.
    pub fn reset_snapshot_validation_counts(&self, id: SnapshotId) -> Result<()> {
        self.mutate(id, true, |row| {
            row.valid_size = 0;
            row.transformed_size = 0;
            row.status = Some(SnapshotStatus::HarvestingFinishedValid);
            row.index_status = IndexStatus::Unknown;
            Ok(())
        })
    }

    /// Overwrite the validation counters from a recomputed set
    ///
    /// Entry point for the incremental-harvest copy, which derives the
    /// counts from the copied records rather than incrementing through the
    /// validation phase.
    pub fn set_validation_counts(
        &self,
        id: SnapshotId,
        valid_size: u64,
        transformed_size: u64,
    ) -> Result<()> {
        self.mutate(id, true, |row| {
            if valid_size > row.size || transformed_size > row.size {
                return Err(StoreError::state(format!(
                    "snapshot {}: recomputed counters exceed size",
                    id
                )));
            }
            row.valid_size = valid_size;
            row.transformed_size = transformed_size;
            Ok(())
        })
    }

    /// Stamp the time this snapshot seeded an incremental harvest
    pub fn set_last_incremental_time(&self, id: SnapshotId) -> Result<()> {
        self.mutate(id, true, |row| {
            row.last_incremental_time = Some(Utc::now());
            Ok(())
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Ids of the network's snapshots, ascending
    pub fn list_snapshots_ids(&self, network_id: i64, include_deleted: bool) -> Vec<SnapshotId> {
        let mut ids: Vec<SnapshotId> = self
            .entries
            .iter()
            .filter_map(|item| {
                let entry = item.value().lock();
                let row = &entry.row;
                (row.network.network_id == network_id && (include_deleted || !row.deleted))
                    .then_some(row.id)
            })
            .collect();
        ids.sort_unstable();
        ids
    }

    fn find_best(
        &self,
        network_id: i64,
        accepts: impl Fn(&SnapshotRow) -> bool,
    ) -> Option<SnapshotRow> {
        self.entries
            .iter()
            .filter_map(|item| {
                let entry = item.value().lock();
                let row = &entry.row;
                (row.network.network_id == network_id && !row.deleted && accepts(row))
                    .then(|| row.clone())
            })
            .max_by_key(|row| row.end_time.unwrap_or(row.start_time))
    }

    /// Most recent non-deleted VALID snapshot of the network
    pub fn find_last_good_known_snapshot(&self, network_id: i64) -> Option<SnapshotRow> {
        self.find_best(network_id, |row| row.status == Some(SnapshotStatus::Valid))
    }

    /// Most recent non-deleted VALID or HARVESTING_FINISHED_VALID snapshot
    pub fn find_last_harvesting_snapshot(&self, network_id: i64) -> Option<SnapshotRow> {
        self.find_best(network_id, |row| {
            matches!(
                row.status,
                Some(SnapshotStatus::Valid) | Some(SnapshotStatus::HarvestingFinishedValid)
            )
        })
    }

    /// Back-link to the snapshot this one was seeded from
    pub fn get_previous_snapshot_id(&self, id: SnapshotId) -> Result<Option<SnapshotId>> {
        Ok(self.get(id)?.previous_snapshot_id)
    }

    /// Set the back-link to the seeding snapshot
    pub fn set_previous_snapshot_id(
        &self,
        id: SnapshotId,
        previous: Option<SnapshotId>,
    ) -> Result<()> {
        self.mutate(id, true, |row| {
            row.previous_snapshot_id = previous;
            Ok(())
        })
    }

    // =========================================================================
    // Cleanup
    // =========================================================================

    /// Remove the snapshot's data, tombstoning or deleting the row
    ///
    /// A VALID or HARVESTING_FINISHED_VALID snapshot keeps its row as a
    /// queryable logical tombstone; anything else is physically removed
    /// together with its directory. Catalog and validation files must have
    /// been removed by their stores before this runs; this call deletes
    /// whatever remains of the snapshot directory in the physical case.
    pub fn clean_snapshot_data(&self, id: SnapshotId) -> Result<CleanOutcome> {
        let row = self.get(id)?;
        let keep_row = matches!(
            row.status,
            Some(SnapshotStatus::Valid) | Some(SnapshotStatus::HarvestingFinishedValid)
        );

        if keep_row {
            self.mark_as_deleted(id)?;
            info!(snapshot = id, "tombstoned snapshot row");
            return Ok(CleanOutcome::Tombstoned);
        }

        self.entries.remove(&id);
        let dir = self.paths.snapshot_dir(&row.network, id);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        info!(snapshot = id, "physically removed snapshot");
        Ok(CleanOutcome::Removed)
    }
}

fn transition_allowed(current: Option<SnapshotStatus>, target: SnapshotStatus) -> bool {
    match target {
        SnapshotStatus::Harvesting => true,
        SnapshotStatus::HarvestingFinishedValid => current == Some(SnapshotStatus::Harvesting),
        SnapshotStatus::HarvestingFinishedError => true,
        SnapshotStatus::Retrying => true,
        SnapshotStatus::Valid => current == Some(SnapshotStatus::HarvestingFinishedValid),
        SnapshotStatus::Deleted => true,
    }
}

fn subdirectories(path: &std::path::Path) -> Result<Vec<std::path::PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn network() -> NetworkRef {
        NetworkRef::new(1, "net")
    }

    fn open(dir: &std::path::Path) -> SnapshotStore {
        SnapshotStore::open(&StoreConfig::for_testing(dir)).unwrap()
    }

    #[test]
    fn test_create_assigns_monotone_ids() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let a = store.create_snapshot(&network()).unwrap();
        let b = store.create_snapshot(&network()).unwrap();
        assert!(b > a);
        assert!(store.get(a).unwrap().status.is_none());
    }

    #[test]
    fn test_happy_path_lifecycle() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let id = store.create_snapshot(&network()).unwrap();

        store.start_harvesting(id).unwrap();
        assert_eq!(store.get(id).unwrap().status, Some(SnapshotStatus::Harvesting));

        store.increment_size(id).unwrap();
        store.increment_snapshot_size_by(id, 2).unwrap();
        store.update_harvesting(id).unwrap();
        store.finish_harvesting(id).unwrap();
        assert_eq!(
            store.get(id).unwrap().status,
            Some(SnapshotStatus::HarvestingFinishedValid)
        );
        assert_eq!(store.get(id).unwrap().size, 3);

        store.start_validation(id).unwrap();
        store.increment_valid_size(id).unwrap();
        store.increment_transformed_size(id).unwrap();
        store.finish_validation(id).unwrap();
        store.mark_as_indexed(id).unwrap();

        let row = store.get(id).unwrap();
        assert_eq!(row.status, Some(SnapshotStatus::Valid));
        assert_eq!(row.index_status, IndexStatus::Indexed);
        assert_eq!(row.valid_size, 1);
        assert_eq!(row.transformed_size, 1);
        assert!(row.counters_consistent());
    }

    #[test]
    fn test_illegal_transition_rejected_without_mutation() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let id = store.create_snapshot(&network()).unwrap();

        // finish before start
        assert!(store.finish_harvesting(id).unwrap_err().is_state_error());
        assert!(store.get(id).unwrap().status.is_none());

        // start_validation without a finished harvest
        assert!(store.start_validation(id).unwrap_err().is_state_error());
        assert!(store.get(id).unwrap().status.is_none());
    }

    #[test]
    fn test_legacy_setter_enforces_table() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let id = store.create_snapshot(&network()).unwrap();

        assert!(store
            .update_snapshot_status(id, SnapshotStatus::Valid)
            .unwrap_err()
            .is_state_error());

        store
            .update_snapshot_status(id, SnapshotStatus::Harvesting)
            .unwrap();
        store
            .update_snapshot_status(id, SnapshotStatus::HarvestingFinishedValid)
            .unwrap();
        store.update_snapshot_status(id, SnapshotStatus::Valid).unwrap();
        assert_eq!(store.get(id).unwrap().status, Some(SnapshotStatus::Valid));
    }

    #[test]
    fn test_size_only_grows_during_harvesting() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let id = store.create_snapshot(&network()).unwrap();
        assert!(store.increment_size(id).unwrap_err().is_state_error());

        store.start_harvesting(id).unwrap();
        store.increment_size(id).unwrap();
        store.finish_harvesting(id).unwrap();
        assert!(store.increment_size(id).unwrap_err().is_state_error());
    }

    #[test]
    fn test_valid_size_bounded_by_size() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let id = store.create_snapshot(&network()).unwrap();
        store.start_harvesting(id).unwrap();
        store.increment_size(id).unwrap();
        store.finish_harvesting(id).unwrap();
        store.start_validation(id).unwrap();

        store.increment_valid_size(id).unwrap();
        assert!(store.increment_valid_size(id).unwrap_err().is_state_error());

        // decrement floors at zero
        store.decrement_valid_size(id).unwrap();
        store.decrement_valid_size(id).unwrap();
        assert_eq!(store.get(id).unwrap().valid_size, 0);
    }

    #[test]
    fn test_reset_validation_counts() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let id = store.create_snapshot(&network()).unwrap();
        store.start_harvesting(id).unwrap();
        store.increment_snapshot_size_by(id, 5).unwrap();
        store.finish_harvesting(id).unwrap();
        store.start_validation(id).unwrap();
        store.increment_valid_size(id).unwrap();
        store.mark_as_indexed(id).unwrap();

        store.reset_snapshot_validation_counts(id).unwrap();
        let row = store.get(id).unwrap();
        assert_eq!(row.valid_size, 0);
        assert_eq!(row.transformed_size, 0);
        assert_eq!(row.status, Some(SnapshotStatus::HarvestingFinishedValid));
        assert_eq!(row.index_status, IndexStatus::Unknown);
    }

    #[test]
    fn test_rows_survive_reopen() {
        let dir = tempdir().unwrap();
        let id;
        {
            let store = open(dir.path());
            id = store.create_snapshot(&network()).unwrap();
            store.start_harvesting(id).unwrap();
            store.increment_snapshot_size_by(id, 3).unwrap();
            store.finish_harvesting(id).unwrap();
            store.flush_all().unwrap();
        }
        let store = open(dir.path());
        let row = store.get(id).unwrap();
        assert_eq!(row.size, 3);
        assert_eq!(row.status, Some(SnapshotStatus::HarvestingFinishedValid));

        // Fresh ids continue past the reloaded maximum
        let next = store.create_snapshot(&network()).unwrap();
        assert!(next > id);
    }

    #[test]
    fn test_autoflush_after_batched_updates() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let id = store.create_snapshot(&network()).unwrap();
        store.start_harvesting(id).unwrap();

        for _ in 0..AUTOFLUSH_UPDATES {
            store.increment_size(id).unwrap();
        }
        // The autoflush threshold has persisted the counter without an
        // explicit flush; a reopened store sees it.
        let reopened = open(dir.path());
        assert_eq!(reopened.get(id).unwrap().size as usize, AUTOFLUSH_UPDATES);
    }

    #[test]
    fn test_find_last_good_known_snapshot() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let net = network();

        assert!(store.find_last_good_known_snapshot(net.network_id).is_none());

        let run = |id: SnapshotId| {
            store.start_harvesting(id).unwrap();
            store.finish_harvesting(id).unwrap();
            store.start_validation(id).unwrap();
            store.finish_validation(id).unwrap();
        };

        let a = store.create_snapshot(&net).unwrap();
        run(a);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = store.create_snapshot(&net).unwrap();
        run(b);

        assert_eq!(store.find_last_good_known_snapshot(net.network_id).unwrap().id, b);

        // Tombstoned snapshots stop qualifying
        store.mark_as_deleted(b).unwrap();
        assert_eq!(store.find_last_good_known_snapshot(net.network_id).unwrap().id, a);
    }

    #[test]
    fn test_find_last_harvesting_snapshot_accepts_finished_valid() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let net = network();

        let id = store.create_snapshot(&net).unwrap();
        store.start_harvesting(id).unwrap();
        store.finish_harvesting(id).unwrap();

        assert!(store.find_last_good_known_snapshot(net.network_id).is_none());
        assert_eq!(
            store.find_last_harvesting_snapshot(net.network_id).unwrap().id,
            id
        );
    }

    #[test]
    fn test_list_snapshots_ids_respects_deleted_flag() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let net = network();
        let a = store.create_snapshot(&net).unwrap();
        let b = store.create_snapshot(&net).unwrap();
        store.mark_as_deleted(a).unwrap();

        assert_eq!(store.list_snapshots_ids(net.network_id, false), vec![b]);
        assert_eq!(store.list_snapshots_ids(net.network_id, true), vec![a, b]);
        assert!(store.list_snapshots_ids(999, true).is_empty());
    }

    #[test]
    fn test_previous_snapshot_linkage() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let net = network();
        let a = store.create_snapshot(&net).unwrap();
        let b = store.create_snapshot(&net).unwrap();

        assert_eq!(store.get_previous_snapshot_id(b).unwrap(), None);
        store.set_previous_snapshot_id(b, Some(a)).unwrap();
        assert_eq!(store.get_previous_snapshot_id(b).unwrap(), Some(a));
    }

    #[test]
    fn test_clean_tombstones_valid_snapshot() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let net = network();
        let id = store.create_snapshot(&net).unwrap();
        store.start_harvesting(id).unwrap();
        store.finish_harvesting(id).unwrap();

        assert_eq!(
            store.clean_snapshot_data(id).unwrap(),
            CleanOutcome::Tombstoned
        );
        // Row stays queryable
        let row = store.get(id).unwrap();
        assert!(row.deleted);
        assert_eq!(row.status, Some(SnapshotStatus::HarvestingFinishedValid));
    }

    #[test]
    fn test_clean_removes_failed_snapshot() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let net = network();
        let id = store.create_snapshot(&net).unwrap();
        store.start_harvesting(id).unwrap();
        store.mark_as_failed(id).unwrap();

        assert_eq!(store.clean_snapshot_data(id).unwrap(), CleanOutcome::Removed);
        assert!(store.get(id).unwrap_err().is_not_found());

        let paths = StorePaths::new(dir.path());
        assert!(!paths.snapshot_dir(&net, id).exists());
    }

    #[test]
    fn test_concurrent_counter_updates() {
        let dir = tempdir().unwrap();
        let store = std::sync::Arc::new(open(dir.path()));
        let id = store.create_snapshot(&network()).unwrap();
        store.start_harvesting(id).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        store.increment_size(id).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get(id).unwrap().size, 200);
    }
}
