//! Incremental harvests
//!
//! A new snapshot seeded from the previous harvesting snapshot's
//! non-deleted records, then extended by the harvester with newly changed
//! records. The copied set recomputes the new snapshot's counters; the
//! previous snapshot is back-linked through `previous_snapshot_id` and
//! stamped as the seed of an incremental run.

use std::collections::HashMap;

use tracing::info;

use oaistore_core::{NetworkRef, RecordStatus, Result, SnapshotMeta, StoreError};

use crate::store::HarvestStore;

impl HarvestStore {
    /// Start an incremental harvest for the network
    ///
    /// Creates a snapshot back-linked to the most recent harvesting
    /// snapshot (VALID or HARVESTING_FINISHED_VALID, non-deleted), copies
    /// that snapshot's non-deleted catalog records, and recomputes
    /// size/valid/transformed from the copied set. The new snapshot is
    /// left in HARVESTING so the harvester can append changed records.
    ///
    /// Fails with `NotFound` when the network has no seed snapshot and
    /// with `StateError` when the seed is deleted.
    pub fn incremental_harvest(&self, network: &NetworkRef) -> Result<SnapshotMeta> {
        let previous = self
            .snapshots()
            .find_last_harvesting_snapshot(network.network_id)
            .ok_or_else(|| {
                StoreError::not_found(format!(
                    "no seed snapshot for network {}",
                    network.network_id
                ))
            })?;
        if previous.deleted {
            return Err(StoreError::state(format!(
                "seed snapshot {} is deleted",
                previous.id
            )));
        }
        let previous_meta = previous.meta();

        let meta = self.create_snapshot(network)?;
        self.snapshots()
            .set_previous_snapshot_id(meta.id, Some(previous.id))?;
        self.snapshots().set_last_incremental_time(meta.id)?;
        self.start_harvesting(&meta)?;

        // Validation outcomes of the seed, for counter recomputation
        let outcomes: HashMap<String, (bool, bool)> = self
            .list_by_status(&previous_meta, RecordStatus::Untested)?
            .into_iter()
            .map(|obs| {
                (
                    obs.identifier.clone(),
                    (obs.record_is_valid, obs.is_transformed),
                )
            })
            .collect();

        let mut copied = 0u64;
        let mut valid = 0u64;
        let mut transformed = 0u64;
        for record in self.records(&previous_meta)?.iter() {
            let record = record?;
            if record.deleted {
                continue;
            }
            if !self.catalogs().write_record(meta.id, &record)? {
                continue;
            }
            copied += 1;
            if let Some(&(is_valid, is_transformed)) = outcomes.get(&record.identifier) {
                if is_valid {
                    valid += 1;
                }
                if is_transformed {
                    transformed += 1;
                }
            }
        }
        self.snapshots().increment_snapshot_size_by(meta.id, copied)?;
        self.snapshots()
            .set_validation_counts(meta.id, valid, transformed)?;
        self.snapshots().flush(meta.id)?;

        info!(
            snapshot = meta.id,
            previous = previous.id,
            copied,
            "seeded incremental harvest"
        );
        Ok(meta)
    }
}
