//! Per-snapshot catalog writer registry
//!
//! One writer object per open snapshot, held in a concurrent map keyed by
//! snapshot id. External callers share the writer handle; the mutex inside
//! each entry serializes appends, rollover, and flush. Values are
//! exclusive-owned handles: handover on insert, explicit close on remove.

use std::fs;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{info, warn};

use oaistore_core::{Result, SnapshotId, SnapshotMeta, StoreConfig, StoreError, StorePaths};

use super::{CatalogReader, CatalogWriter};

/// Registry of open catalog writers, keyed by snapshot id
pub struct CatalogWriterRegistry {
    config: StoreConfig,
    paths: StorePaths,
    writers: DashMap<SnapshotId, Arc<Mutex<CatalogWriter>>>,
}

impl CatalogWriterRegistry {
    /// Create a registry for the configured store
    pub fn new(config: StoreConfig) -> Self {
        let paths = StorePaths::new(&config.base_path);
        CatalogWriterRegistry {
            config,
            paths,
            writers: DashMap::new(),
        }
    }

    /// Create the snapshot's catalog directory and open its writer
    pub fn initialize(&self, meta: &SnapshotMeta) -> Result<()> {
        let dir = self.paths.catalog_dir(&meta.network, meta.id);
        let writer = CatalogWriter::new(dir, &self.config)?;
        self.writers.insert(meta.id, Arc::new(Mutex::new(writer)));
        info!(snapshot = meta.id, "initialized catalog writer");
        Ok(())
    }

    /// Shared handle to an open writer
    ///
    /// Fails with `StateError` when the snapshot was never initialized.
    pub fn writer_for(&self, id: SnapshotId) -> Result<Arc<Mutex<CatalogWriter>>> {
        self.writers
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                StoreError::state(format!("catalog writer for snapshot {} not initialized", id))
            })
    }

    /// Buffer one record into the snapshot's stream
    pub fn write_record(&self, id: SnapshotId, record: &oaistore_core::OaiRecord) -> Result<bool> {
        let writer = self.writer_for(id)?;
        let mut writer = writer.lock();
        writer.write_record(record)
    }

    /// Flush the snapshot's current batch without closing the writer
    pub fn flush(&self, id: SnapshotId) -> Result<()> {
        let writer = self.writer_for(id)?;
        let mut writer = writer.lock();
        writer.flush()
    }

    /// Flush and close the snapshot's writer
    ///
    /// Finalizing a snapshot that was never initialized logs a warning and
    /// succeeds as a no-op.
    pub fn finalize(&self, id: SnapshotId) -> Result<()> {
        match self.writers.remove(&id) {
            Some((_, writer)) => {
                let mut writer = writer.lock();
                writer.flush()?;
                info!(snapshot = id, "finalized catalog writer");
                Ok(())
            }
            None => {
                warn!(snapshot = id, "finalize of uninitialized catalog writer; no-op");
                Ok(())
            }
        }
    }

    /// Open a fresh reader over the snapshot's closed batches
    pub fn reader(&self, meta: &SnapshotMeta) -> Result<CatalogReader> {
        CatalogReader::open(self.paths.catalog_dir(&meta.network, meta.id))
    }

    /// Remove all catalog files of the snapshot
    ///
    /// Validation files are untouched.
    pub fn delete(&self, meta: &SnapshotMeta) -> Result<()> {
        self.writers.remove(&meta.id);
        let dir = self.paths.catalog_dir(&meta.network, meta.id);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oaistore_core::{NetworkRef, OaiRecord};
    use tempfile::tempdir;

    fn meta() -> SnapshotMeta {
        SnapshotMeta::new(7, NetworkRef::new(1, "net"))
    }

    fn record(n: u32) -> OaiRecord {
        OaiRecord::new(format!("oai:x:{}", n), n as i64, "h", false)
    }

    #[test]
    fn test_write_without_initialize_is_state_error() {
        let dir = tempdir().unwrap();
        let registry = CatalogWriterRegistry::new(StoreConfig::for_testing(dir.path()));
        let err = registry.write_record(7, &record(1)).unwrap_err();
        assert!(err.is_state_error());
    }

    #[test]
    fn test_finalize_uninitialized_is_noop() {
        let dir = tempdir().unwrap();
        let registry = CatalogWriterRegistry::new(StoreConfig::for_testing(dir.path()));
        registry.finalize(99).unwrap();
    }

    #[test]
    fn test_write_flush_read() {
        let dir = tempdir().unwrap();
        let registry = CatalogWriterRegistry::new(StoreConfig::for_testing(dir.path()));
        let meta = meta();
        registry.initialize(&meta).unwrap();
        for n in 1..=3 {
            assert!(registry.write_record(meta.id, &record(n)).unwrap());
        }
        registry.finalize(meta.id).unwrap();

        let reader = registry.reader(&meta).unwrap();
        assert_eq!(reader.count().unwrap(), 3);
    }

    #[test]
    fn test_concurrent_writers_share_one_stream() {
        let dir = tempdir().unwrap();
        let registry =
            Arc::new(CatalogWriterRegistry::new(StoreConfig::for_testing(dir.path())));
        let meta = meta();
        registry.initialize(&meta).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for n in 0..25u32 {
                        let rec = OaiRecord::new(
                            format!("oai:x:{}-{}", t, n),
                            n as i64,
                            "h",
                            false,
                        );
                        registry.write_record(7, &rec).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        registry.finalize(meta.id).unwrap();

        let reader = registry.reader(&meta).unwrap();
        assert_eq!(reader.count().unwrap(), 100);
    }

    #[test]
    fn test_delete_removes_catalog_only() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::for_testing(dir.path());
        let registry = CatalogWriterRegistry::new(config.clone());
        let meta = meta();
        registry.initialize(&meta).unwrap();
        registry.write_record(meta.id, &record(1)).unwrap();
        registry.finalize(meta.id).unwrap();

        let paths = StorePaths::new(&config.base_path);
        let validation_dir = paths.validation_dir(&meta.network, meta.id);
        fs::create_dir_all(&validation_dir).unwrap();
        fs::write(validation_dir.join("validation_index.parquet"), b"x").unwrap();

        registry.delete(&meta).unwrap();
        assert!(!paths.catalog_dir(&meta.network, meta.id).exists());
        assert!(validation_dir.join("validation_index.parquet").exists());
    }
}
