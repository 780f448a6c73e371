//! The harvest store facade

use std::fs;
use std::sync::Arc;

use tracing::{info, warn};

use oaistore_blobstore::{BlobStorePool, MetadataStore};
use oaistore_core::{
    NetworkRef, OaiRecord, RecordObservation, RecordStatus, RecordValidation, Result, SnapshotId,
    SnapshotMeta, StopSignal, StoreConfig, StoreError, StorePaths,
};
use oaistore_records::{
    CatalogReader, CatalogWriterRegistry, PaginatedRecords, QueryService, RuleOccurrences,
    ValidationCache, ValidationStats, ValidationWriterRegistry,
};
use oaistore_snapshot::{CleanOutcome, SnapshotRow, SnapshotStore};

/// One record as it arrives from the harvester
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestedRecord {
    /// OAI identifier
    pub identifier: String,
    /// Datestamp, epoch milliseconds UTC
    pub datestamp: i64,
    /// Deletion flag reported by the remote repository
    pub deleted: bool,
    /// Harvested XML payload
    pub content: String,
}

/// Facade over the snapshot, blob, catalog, and validation subsystems
pub struct HarvestStore {
    config: StoreConfig,
    paths: StorePaths,
    snapshots: SnapshotStore,
    blobs: BlobStorePool,
    catalogs: CatalogWriterRegistry,
    validations: ValidationWriterRegistry,
    query: QueryService,
}

impl HarvestStore {
    /// Open a store rooted at the configured base path
    pub fn open(config: StoreConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| StoreError::invalid(e.to_string()))?;
        let paths = StorePaths::new(&config.base_path);
        let snapshots = SnapshotStore::open(&config)?;
        let blobs = BlobStorePool::new(config.clone());
        let catalogs = CatalogWriterRegistry::new(config.clone());
        let validations = ValidationWriterRegistry::new(config.clone());
        let cache = Arc::new(ValidationCache::new(&config));
        let query = QueryService::new(&config, cache);
        info!(base = %config.base_path.display(), "opened harvest store");
        Ok(HarvestStore {
            config,
            paths,
            snapshots,
            blobs,
            catalogs,
            validations,
            query,
        })
    }

    /// The store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The authoritative snapshot store
    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// The blob store of a network
    pub fn blob_store(&self, network: &NetworkRef) -> Result<Arc<dyn MetadataStore>> {
        self.blobs.store_for(network)
    }

    // =========================================================================
    // Snapshot lifecycle
    // =========================================================================

    /// Create a snapshot for the network
    pub fn create_snapshot(&self, network: &NetworkRef) -> Result<SnapshotMeta> {
        let id = self.snapshots.create_snapshot(network)?;
        Ok(SnapshotMeta::new(id, network.clone()))
    }

    /// Current row of a snapshot
    pub fn get_snapshot(&self, id: SnapshotId) -> Result<SnapshotRow> {
        self.snapshots.get(id)
    }

    /// Enter HARVESTING and open the snapshot's catalog writer
    pub fn start_harvesting(&self, meta: &SnapshotMeta) -> Result<()> {
        self.snapshots.start_harvesting(meta.id)?;
        self.catalogs.initialize(meta)
    }

    /// Close the harvest: finalize the catalog, advance the state machine
    pub fn finish_harvesting(&self, meta: &SnapshotMeta) -> Result<()> {
        self.catalogs.finalize(meta.id)?;
        self.snapshots.finish_harvesting(meta.id)?;
        self.snapshots.flush(meta.id)
    }

    /// Enter the validation phase and open the validation writer
    pub fn start_validation(&self, meta: &SnapshotMeta) -> Result<()> {
        self.snapshots.start_validation(meta.id)?;
        self.validations.initialize(meta)
    }

    /// Close validation: finalize the writer, persist aggregated stats
    pub fn finish_validation(&self, meta: &SnapshotMeta) -> Result<()> {
        self.validations.finalize(meta.id)?;
        self.query.cache().invalidate(meta.id);
        self.write_validation_stats(meta)?;
        self.snapshots.finish_validation(meta.id)?;
        self.snapshots.flush(meta.id)
    }

    fn write_validation_stats(&self, meta: &SnapshotMeta) -> Result<()> {
        let stats = self.query.build_stats(meta, &[])?;
        let path = self.paths.validation_stats_file(&meta.network, meta.id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(&stats)?)?;
        Ok(())
    }

    // =========================================================================
    // Record ingest
    // =========================================================================

    /// Store one harvested record: blob put, catalog append, size counter
    ///
    /// Returns the catalog record id, or `None` when the record was
    /// skipped as invalid.
    pub fn store_record(
        &self,
        meta: &SnapshotMeta,
        record: &HarvestedRecord,
    ) -> Result<Option<String>> {
        let hash = self.blob_store(&meta.network)?.put(&record.content)?;
        let row = OaiRecord::new(
            record.identifier.clone(),
            record.datestamp,
            hash,
            record.deleted,
        );
        if !self.catalogs.write_record(meta.id, &row)? {
            return Ok(None);
        }
        self.snapshots.increment_size(meta.id)?;
        Ok(Some(row.id))
    }

    /// Store a batch, observing the stop signal between records
    ///
    /// On stop the current batch is flushed and the writer left open; the
    /// workflow engine decides the snapshot's resulting status. Returns
    /// how many records were stored.
    pub fn harvest_batch(
        &self,
        meta: &SnapshotMeta,
        records: impl IntoIterator<Item = HarvestedRecord>,
        stop: &StopSignal,
    ) -> Result<usize> {
        let mut stored = 0;
        for record in records {
            if stop.is_stopped() {
                warn!(snapshot = meta.id, stored, "harvest stopped by signal");
                self.catalogs.flush(meta.id)?;
                return Ok(stored);
            }
            if self.store_record(meta, &record)?.is_some() {
                stored += 1;
            }
        }
        Ok(stored)
    }

    /// Stream the snapshot's catalog
    pub fn records(&self, meta: &SnapshotMeta) -> Result<CatalogReader> {
        self.catalogs.reader(meta)
    }

    // =========================================================================
    // Validation ingest
    // =========================================================================

    /// Store a published (post-transform) payload, returning its fingerprint
    pub fn store_published(&self, meta: &SnapshotMeta, content: &str) -> Result<String> {
        self.blob_store(&meta.network)?.put(content)
    }

    /// Store one validation outcome and move the phase counters
    pub fn store_validation(&self, meta: &SnapshotMeta, outcome: &RecordValidation) -> Result<bool> {
        if !self.validations.write(meta.id, outcome)? {
            return Ok(false);
        }
        if outcome.record_is_valid {
            self.snapshots.increment_valid_size(meta.id)?;
        }
        if outcome.is_transformed {
            self.snapshots.increment_transformed_size(meta.id)?;
        }
        self.query.cache().invalidate(meta.id);
        Ok(true)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Aggregate stats over the filtered records
    pub fn build_stats(&self, meta: &SnapshotMeta, filters: &[String]) -> Result<ValidationStats> {
        self.query.build_stats(meta, filters)
    }

    /// Histogram one rule's occurrence values
    pub fn calculate_rule_occurrences(
        &self,
        meta: &SnapshotMeta,
        rule_id: i32,
        filters: &[String],
    ) -> Result<RuleOccurrences> {
        self.query.calculate_rule_occurrences(meta, rule_id, filters)
    }

    /// One page of the filtered records
    pub fn query_observations_with_pagination(
        &self,
        meta: &SnapshotMeta,
        filters: &[String],
        offset: usize,
        limit: usize,
    ) -> Result<PaginatedRecords> {
        self.query
            .query_observations_with_pagination(meta, filters, offset, limit)
    }

    /// Lightweight projection filtered by status
    pub fn list_by_status(
        &self,
        meta: &SnapshotMeta,
        status: RecordStatus,
    ) -> Result<Vec<RecordObservation>> {
        self.query.list_by_status(meta, status)
    }

    /// One id-cursor page of the lightweight projection
    pub fn page_after(
        &self,
        meta: &SnapshotMeta,
        status: RecordStatus,
        last_seen_id: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<RecordObservation>> {
        self.query.page_after(meta, status, last_seen_id, page_size)
    }

    // =========================================================================
    // Cleanup
    // =========================================================================

    /// Remove the snapshot's record data and tombstone or delete its row
    pub fn clean_snapshot_data(&self, id: SnapshotId) -> Result<CleanOutcome> {
        let meta = self.snapshots.meta(id)?;
        self.catalogs.delete(&meta)?;
        self.validations.delete(&meta)?;
        self.query.cache().invalidate(id);
        self.snapshots.clean_snapshot_data(id)
    }

    pub(crate) fn catalogs(&self) -> &CatalogWriterRegistry {
        &self.catalogs
    }
}
