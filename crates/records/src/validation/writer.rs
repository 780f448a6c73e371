//! Validation batch writer
//!
//! Follows the catalog writer's batching policy for the full rows and
//! additionally accumulates the lightweight projection in memory. On every
//! flush the projection is serialized as `validation_index.parquet`,
//! replacing the previous index; batch files are never overwritten.
//! Between a write and the next flush the index file lags the batches;
//! the documented window.

use std::path::PathBuf;

use parquet::file::properties::WriterProperties;
use tracing::{debug, warn};

use oaistore_core::{
    paths::validation_batch_name, RecordObservation, RecordValidation, Result, StoreConfig,
    StoreError,
};

use crate::parquet_util::{publish_batch, writer_properties};

use super::{observations_to_batch, validations_to_batch};

/// Batched writer for one snapshot's validation stream and index
pub struct ValidationWriter {
    dir: PathBuf,
    records_per_file: usize,
    props: WriterProperties,
    buffer: Vec<RecordValidation>,
    index: Vec<RecordObservation>,
    batches_written: usize,
    records_written: u64,
}

impl ValidationWriter {
    /// Create a writer rooted at the snapshot's `validation/` directory
    pub fn new(dir: PathBuf, config: &StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(ValidationWriter {
            dir,
            records_per_file: config.validation_records_per_file.max(1),
            props: writer_properties(config),
            buffer: Vec::new(),
            index: Vec::new(),
            batches_written: 0,
            records_written: 0,
        })
    }

    /// Buffer one validation outcome, rolling the batch at the threshold
    ///
    /// Rows without an identifier are skipped with a warning. Returns
    /// whether the row was accepted.
    pub fn write(&mut self, row: &RecordValidation) -> Result<bool> {
        if row.identifier.is_empty() {
            warn!("skipping validation row with empty identifier");
            return Ok(false);
        }
        self.index.push(row.observation());
        self.buffer.push(row.clone());
        self.records_written += 1;
        if self.buffer.len() >= self.records_per_file {
            self.roll()?;
        }
        Ok(true)
    }

    /// Close the current batch (if non-empty) and rewrite the index file
    ///
    /// After this returns, the index row count equals the sum of rows
    /// across all published batch files.
    pub fn flush(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.roll()?;
        }
        let index_batch = observations_to_batch(&self.index)?;
        publish_batch(
            &self.dir.join("validation_index.parquet"),
            &index_batch,
            self.props.clone(),
        )?;
        debug!(rows = self.index.len(), "rewrote validation index");
        Ok(())
    }

    fn roll(&mut self) -> Result<()> {
        let index = self.batches_written + 1;
        let path = self.dir.join(validation_batch_name(index));
        if path.exists() {
            return Err(StoreError::state(format!(
                "validation batch {} already published",
                path.display()
            )));
        }
        let batch = validations_to_batch(&self.buffer)?;
        publish_batch(&path, &batch, self.props.clone())?;
        debug!(batch = index, rows = self.buffer.len(), "published validation batch");
        self.buffer.clear();
        self.batches_written = index;
        Ok(())
    }

    /// Rows accepted since the writer was created
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Completed batch files so far
    pub fn batches_written(&self) -> usize {
        self.batches_written
    }
}
