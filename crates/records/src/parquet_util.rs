//! Shared Parquet plumbing for the catalog and validation streams

use std::fs::{self, File};
use std::path::Path;

use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;

use oaistore_core::{ParquetCompression, Result, StoreConfig, StoreError};

/// Writer properties derived from the store configuration
pub(crate) fn writer_properties(config: &StoreConfig) -> WriterProperties {
    let compression = match config.compression {
        ParquetCompression::Snappy => Compression::SNAPPY,
        ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
        ParquetCompression::None => Compression::UNCOMPRESSED,
    };
    WriterProperties::builder()
        .set_compression(compression)
        .set_dictionary_enabled(config.enable_dictionary)
        .set_data_page_size_limit(config.page_size)
        .build()
}

/// Write one batch as a complete Parquet file, publishing atomically
///
/// The batch is written under `<final>.inprogress` and renamed into place
/// once closed, so concurrent readers only ever discover complete files.
pub(crate) fn publish_batch(
    final_path: &Path,
    batch: &RecordBatch,
    props: WriterProperties,
) -> Result<()> {
    let parent = final_path
        .parent()
        .ok_or_else(|| StoreError::store_io("batch path has no parent"))?;
    fs::create_dir_all(parent)?;

    let tmp = tmp_path(final_path);
    let file = File::create(&tmp)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .map_err(|e| StoreError::store_io_with_source("open parquet writer", e))?;
    writer
        .write(batch)
        .map_err(|e| StoreError::store_io_with_source("write parquet batch", e))?;
    writer
        .close()
        .map_err(|e| StoreError::store_io_with_source("close parquet writer", e))?;
    fs::rename(&tmp, final_path)?;
    Ok(())
}

fn tmp_path(final_path: &Path) -> std::path::PathBuf {
    let mut name = final_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".inprogress");
    final_path.with_file_name(name)
}

/// Read every record batch of a Parquet file into memory
pub(crate) fn read_batches(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| StoreError::store_io_with_source("open parquet reader", e))?
        .build()
        .map_err(|e| StoreError::store_io_with_source("build parquet reader", e))?;
    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch.map_err(|e| StoreError::store_io_with_source("read parquet batch", e))?);
    }
    Ok(batches)
}

/// Row count of a Parquet file, from footer metadata only
pub(crate) fn row_count(path: &Path) -> Result<i64> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| StoreError::store_io_with_source("open parquet metadata", e))?;
    Ok(builder.metadata().file_metadata().num_rows())
}

/// List completed batch files in a directory, ordered by batch index
///
/// Returns an empty list when the directory does not exist (no batch was
/// ever flushed).
pub(crate) fn list_batch_files(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut indexed = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(index) = oaistore_core::paths::parse_batch_index(&name) {
            indexed.push((index, entry.path()));
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, path)| path).collect())
}
