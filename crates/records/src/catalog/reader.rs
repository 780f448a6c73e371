//! Forward-only catalog reader
//!
//! Discovers the closed batch files of one snapshot and streams their rows
//! lazily: each file is fully decoded when reached and released before the
//! next one opens, so no file handle is held across the boundary. Every
//! `iter` call yields independent state, so concurrent scans of the same
//! snapshot do not share anything.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use oaistore_core::{OaiRecord, Result};

use crate::parquet_util::{list_batch_files, read_batches, row_count};

use super::batch_to_records;

/// Reader over one snapshot's catalog stream
pub struct CatalogReader {
    files: Vec<PathBuf>,
}

impl CatalogReader {
    /// Open a reader over the snapshot's `catalog/` directory
    ///
    /// A missing directory reads as an empty stream (nothing was ever
    /// flushed).
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(CatalogReader {
            files: list_batch_files(dir.as_ref())?,
        })
    }

    /// Stream all records in write order
    pub fn iter(&self) -> CatalogIter {
        CatalogIter {
            files: self.files.clone().into(),
            current: VecDeque::new(),
            failed: false,
        }
    }

    /// Total rows across all batch files, from footer metadata only
    pub fn count(&self) -> Result<u64> {
        let mut total = 0i64;
        for file in &self.files {
            total += row_count(file)?;
        }
        Ok(total as u64)
    }

    /// Number of completed batch files
    pub fn batch_count(&self) -> usize {
        self.files.len()
    }
}

/// Lazy iterator over catalog rows
pub struct CatalogIter {
    files: VecDeque<PathBuf>,
    current: VecDeque<OaiRecord>,
    failed: bool,
}

impl Iterator for CatalogIter {
    type Item = Result<OaiRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(record) = self.current.pop_front() {
                return Some(Ok(record));
            }
            let file = self.files.pop_front()?;
            match load_file(&file) {
                Ok(records) => self.current = records.into(),
                Err(e) => {
                    // Structural faults are fatal to the scan
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

fn load_file(path: &Path) -> Result<Vec<OaiRecord>> {
    let mut records = Vec::new();
    for batch in read_batches(path)? {
        records.extend(batch_to_records(&batch)?);
    }
    Ok(records)
}
