//! Catalog batch writer
//!
//! Buffers rows for one snapshot and publishes a closed Parquet file every
//! `records_per_file` rows. Files are named `oai_records_batch_{N}.parquet`
//! with N counting from 1 in write order; a new file exists only once it is
//! complete, so readers never see an open batch.

use std::path::PathBuf;

use parquet::file::properties::WriterProperties;
use tracing::{debug, warn};

use oaistore_core::{paths::catalog_batch_name, OaiRecord, Result, StoreConfig, StoreError};

use crate::parquet_util::{publish_batch, writer_properties};

use super::records_to_batch;

/// Batched writer for one snapshot's catalog stream
///
/// Owned by the [`CatalogWriterRegistry`](super::CatalogWriterRegistry);
/// callers share it behind a mutex, which serializes `write_record`,
/// rollover, and `flush`.
pub struct CatalogWriter {
    dir: PathBuf,
    records_per_file: usize,
    props: WriterProperties,
    buffer: Vec<OaiRecord>,
    batches_written: usize,
    records_written: u64,
}

impl CatalogWriter {
    /// Create a writer rooted at the snapshot's `catalog/` directory
    pub fn new(dir: PathBuf, config: &StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(CatalogWriter {
            dir,
            records_per_file: config.catalog_records_per_file.max(1),
            props: writer_properties(config),
            buffer: Vec::new(),
            batches_written: 0,
            records_written: 0,
        })
    }

    /// Buffer one record, rolling the batch file at the threshold
    ///
    /// Records missing required fields are skipped with a warning, not an
    /// error; a missing id is derived from the identifier. Returns whether
    /// the record was accepted.
    pub fn write_record(&mut self, record: &OaiRecord) -> Result<bool> {
        if record.identifier.is_empty() {
            warn!("skipping catalog record with empty identifier");
            return Ok(false);
        }
        if record.original_metadata_hash.is_empty() {
            warn!(
                identifier = %record.identifier,
                "skipping catalog record without original metadata hash"
            );
            return Ok(false);
        }

        let mut record = record.clone();
        if record.id.is_empty() {
            record.id = oaistore_core::record_id(&record.identifier);
        }

        self.buffer.push(record);
        self.records_written += 1;
        if self.buffer.len() >= self.records_per_file {
            self.roll()?;
        }
        Ok(true)
    }

    /// Close the current batch file if any rows are buffered
    ///
    /// Does not preallocate the next file; that happens lazily on the next
    /// write.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.roll()
    }

    fn roll(&mut self) -> Result<()> {
        let index = self.batches_written + 1;
        let path = self.dir.join(catalog_batch_name(index));
        if path.exists() {
            return Err(StoreError::state(format!(
                "catalog batch {} already published",
                path.display()
            )));
        }
        let batch = records_to_batch(&self.buffer)?;
        publish_batch(&path, &batch, self.props.clone())?;
        debug!(batch = index, rows = self.buffer.len(), "published catalog batch");
        self.buffer.clear();
        self.batches_written = index;
        Ok(())
    }

    /// Records accepted since the writer was created
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Completed batch files so far
    pub fn batches_written(&self) -> usize {
        self.batches_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogReader;
    use tempfile::tempdir;

    fn record(n: u32) -> OaiRecord {
        OaiRecord::new(format!("oai:x:{}", n), n as i64 * 1000, format!("h{}", n), false)
    }

    #[test]
    fn test_rolls_at_threshold() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::for_testing(dir.path()).with_catalog_records_per_file(3);
        let mut writer = CatalogWriter::new(dir.path().join("catalog"), &config).unwrap();

        for n in 0..7 {
            assert!(writer.write_record(&record(n)).unwrap());
        }
        // Two full batches published, one record still buffered
        assert_eq!(writer.batches_written(), 2);
        writer.flush().unwrap();
        assert_eq!(writer.batches_written(), 3);
        assert_eq!(writer.records_written(), 7);
    }

    #[test]
    fn test_flush_empty_is_noop() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::for_testing(dir.path());
        let mut writer = CatalogWriter::new(dir.path().join("catalog"), &config).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.batches_written(), 0);

        writer.write_record(&record(1)).unwrap();
        writer.flush().unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.batches_written(), 1);
    }

    #[test]
    fn test_invalid_records_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::for_testing(dir.path());
        let mut writer = CatalogWriter::new(dir.path().join("catalog"), &config).unwrap();

        let mut empty_identifier = record(1);
        empty_identifier.identifier = String::new();
        assert!(!writer.write_record(&empty_identifier).unwrap());

        let mut no_hash = record(2);
        no_hash.original_metadata_hash = String::new();
        assert!(!writer.write_record(&no_hash).unwrap());

        assert_eq!(writer.records_written(), 0);
    }

    #[test]
    fn test_missing_id_derived_from_identifier() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::for_testing(dir.path());
        let catalog_dir = dir.path().join("catalog");
        let mut writer = CatalogWriter::new(catalog_dir.clone(), &config).unwrap();

        let mut rec = record(1);
        rec.id = String::new();
        writer.write_record(&rec).unwrap();
        writer.flush().unwrap();

        let rows: Vec<OaiRecord> = CatalogReader::open(&catalog_dir)
            .unwrap()
            .iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(rows[0].id, oaistore_core::record_id("oai:x:1"));
    }
}
