//! Append-only OAI record catalog
//!
//! One batched, columnar stream per snapshot under
//! `snapshots/snapshot_{id}/catalog/`. Rows are written once and never
//! rewritten; readers stream the closed batch files in write order.

mod reader;
mod registry;
mod writer;

pub use reader::CatalogReader;
pub use registry::CatalogWriterRegistry;
pub use writer::CatalogWriter;

use arrow::array::{Array, ArrayRef, BooleanArray, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use oaistore_core::{OaiRecord, Result, StoreError};

/// Encode catalog rows as one Arrow record batch
///
/// Columns per the on-disk schema: `id`, `identifier` (UTF8),
/// `datestamp` (INT64 epoch ms), `original_metadata_hash` (UTF8),
/// `deleted` (BOOLEAN); all required.
pub(crate) fn records_to_batch(records: &[OaiRecord]) -> Result<RecordBatch> {
    let id: ArrayRef = Arc::new(StringArray::from_iter_values(
        records.iter().map(|r| r.id.as_str()),
    ));
    let identifier: ArrayRef = Arc::new(StringArray::from_iter_values(
        records.iter().map(|r| r.identifier.as_str()),
    ));
    let datestamp: ArrayRef = Arc::new(Int64Array::from_iter_values(
        records.iter().map(|r| r.datestamp),
    ));
    let original_metadata_hash: ArrayRef = Arc::new(StringArray::from_iter_values(
        records.iter().map(|r| r.original_metadata_hash.as_str()),
    ));
    let deleted: ArrayRef = Arc::new(BooleanArray::from(
        records.iter().map(|r| r.deleted).collect::<Vec<bool>>(),
    ));

    RecordBatch::try_from_iter_with_nullable(vec![
        ("id", id, false),
        ("identifier", identifier, false),
        ("datestamp", datestamp, false),
        ("original_metadata_hash", original_metadata_hash, false),
        ("deleted", deleted, false),
    ])
    .map_err(|e| StoreError::store_io_with_source("assemble catalog batch", e))
}

/// Decode one Arrow record batch back into catalog rows
pub(crate) fn batch_to_records(batch: &RecordBatch) -> Result<Vec<OaiRecord>> {
    let id = string_column(batch, "id")?;
    let identifier = string_column(batch, "identifier")?;
    let datestamp = int64_column(batch, "datestamp")?;
    let hash = string_column(batch, "original_metadata_hash")?;
    let deleted = bool_column(batch, "deleted")?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        records.push(OaiRecord {
            id: id.value(row).to_string(),
            identifier: identifier.value(row).to_string(),
            datestamp: datestamp.value(row),
            original_metadata_hash: hash.value(row).to_string(),
            deleted: deleted.value(row),
        });
    }
    Ok(records)
}

pub(crate) fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| StoreError::parse(format!("column {} is not UTF8", name)))
}

pub(crate) fn int64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| StoreError::parse(format!("column {} is not INT64", name)))
}

pub(crate) fn bool_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a BooleanArray> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<BooleanArray>()
        .ok_or_else(|| StoreError::parse(format!("column {} is not BOOLEAN", name)))
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| StoreError::parse(format!("missing column {}", name)))
}
