//! Per-snapshot validation writer registry
//!
//! Same ownership discipline as the catalog registry: one writer per open
//! snapshot in a concurrent map, appends and flushes serialized inside the
//! entry's mutex, explicit close on remove.

use std::fs;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{info, warn};

use oaistore_core::{
    RecordValidation, Result, SnapshotId, SnapshotMeta, StoreConfig, StoreError, StorePaths,
};

use super::{ValidationReader, ValidationWriter};

/// Registry of open validation writers, keyed by snapshot id
pub struct ValidationWriterRegistry {
    config: StoreConfig,
    paths: StorePaths,
    writers: DashMap<SnapshotId, Arc<Mutex<ValidationWriter>>>,
}

impl ValidationWriterRegistry {
    /// Create a registry for the configured store
    pub fn new(config: StoreConfig) -> Self {
        let paths = StorePaths::new(&config.base_path);
        ValidationWriterRegistry {
            config,
            paths,
            writers: DashMap::new(),
        }
    }

    /// Create the snapshot's validation directory and open its writer
    pub fn initialize(&self, meta: &SnapshotMeta) -> Result<()> {
        let dir = self.paths.validation_dir(&meta.network, meta.id);
        let writer = ValidationWriter::new(dir, &self.config)?;
        self.writers.insert(meta.id, Arc::new(Mutex::new(writer)));
        info!(snapshot = meta.id, "initialized validation writer");
        Ok(())
    }

    /// Shared handle to an open writer
    pub fn writer_for(&self, id: SnapshotId) -> Result<Arc<Mutex<ValidationWriter>>> {
        self.writers
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                StoreError::state(format!(
                    "validation writer for snapshot {} not initialized",
                    id
                ))
            })
    }

    /// Buffer one validation outcome
    pub fn write(&self, id: SnapshotId, row: &RecordValidation) -> Result<bool> {
        let writer = self.writer_for(id)?;
        let mut writer = writer.lock();
        writer.write(row)
    }

    /// Flush batches and rewrite the index
    pub fn flush(&self, id: SnapshotId) -> Result<()> {
        let writer = self.writer_for(id)?;
        let mut writer = writer.lock();
        writer.flush()
    }

    /// Flush and close the snapshot's writer
    ///
    /// A never-initialized snapshot finalizes as a warned no-op.
    pub fn finalize(&self, id: SnapshotId) -> Result<()> {
        match self.writers.remove(&id) {
            Some((_, writer)) => {
                let mut writer = writer.lock();
                writer.flush()?;
                info!(snapshot = id, "finalized validation writer");
                Ok(())
            }
            None => {
                warn!(snapshot = id, "finalize of uninitialized validation writer; no-op");
                Ok(())
            }
        }
    }

    /// Open a fresh reader over the snapshot's validation artifacts
    pub fn reader(&self, meta: &SnapshotMeta) -> Result<ValidationReader> {
        ValidationReader::open(self.paths.validation_dir(&meta.network, meta.id))
    }

    /// Remove all validation files of the snapshot
    ///
    /// Catalog files are untouched.
    pub fn delete(&self, meta: &SnapshotMeta) -> Result<()> {
        self.writers.remove(&meta.id);
        let dir = self.paths.validation_dir(&meta.network, meta.id);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}
