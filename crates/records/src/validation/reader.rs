//! Validation readers
//!
//! Two read paths: the full iterator decodes the nested rule facts from
//! the batch files; the lightweight path reads only the index file.
//! Readers are independent per call and only ever observe closed files.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::warn;

use oaistore_core::{RecordObservation, RecordStatus, RecordValidation, Result};

use crate::parquet_util::{list_batch_files, read_batches, row_count};

use super::{batch_to_observations, batch_to_validations};

/// Reader over one snapshot's validation artifacts
pub struct ValidationReader {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl ValidationReader {
    /// Open a reader over the snapshot's `validation/` directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        Ok(ValidationReader {
            files: list_batch_files(&dir)?,
            dir,
        })
    }

    /// Stream full rows (rule facts included) in write order
    pub fn iter(&self) -> ValidationIter {
        ValidationIter {
            files: self.files.clone().into(),
            current: VecDeque::new(),
            failed: false,
        }
    }

    /// Materialize every full row
    pub fn load_all(&self) -> Result<Vec<RecordValidation>> {
        self.iter().collect()
    }

    /// Materialize the lightweight projection, filtered by status
    ///
    /// A snapshot whose index was never flushed reads as empty with a
    /// warning. Per-row absence degrades; structural faults do not.
    pub fn load_lightweight_index(&self, status: RecordStatus) -> Result<Vec<RecordObservation>> {
        let index = self.dir.join("validation_index.parquet");
        if !index.exists() {
            warn!(dir = %self.dir.display(), "validation index missing; reading as empty");
            return Ok(Vec::new());
        }
        let mut rows = Vec::new();
        for batch in read_batches(&index)? {
            for obs in batch_to_observations(&batch)? {
                if status.accepts(obs.record_is_valid) {
                    rows.push(obs);
                }
            }
        }
        Ok(rows)
    }

    /// Total rows across the batch files, from footer metadata
    pub fn batch_rows(&self) -> Result<u64> {
        let mut total = 0i64;
        for file in &self.files {
            total += row_count(file)?;
        }
        Ok(total as u64)
    }

    /// Rows in the index file (0 when the index was never written)
    pub fn index_rows(&self) -> Result<u64> {
        let index = self.dir.join("validation_index.parquet");
        if !index.exists() {
            return Ok(0);
        }
        Ok(row_count(&index)? as u64)
    }
}

/// Lazy iterator over full validation rows
pub struct ValidationIter {
    files: VecDeque<PathBuf>,
    current: VecDeque<RecordValidation>,
    failed: bool,
}

impl Iterator for ValidationIter {
    type Item = Result<RecordValidation>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(row) = self.current.pop_front() {
                return Some(Ok(row));
            }
            let file = self.files.pop_front()?;
            match load_file(&file) {
                Ok(rows) => self.current = rows.into(),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

fn load_file(path: &Path) -> Result<Vec<RecordValidation>> {
    let mut rows = Vec::new();
    for batch in read_batches(path)? {
        rows.extend(batch_to_validations(&batch)?);
    }
    Ok(rows)
}
