//! Store configuration
//!
//! Every knob the core recognizes, with the documented defaults. The
//! snapshot, catalog, validation, and blob subsystems all read from one
//! `StoreConfig` value handed to them at open time.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum enforced capacity of the validation records cache
pub const MIN_CACHE_SNAPSHOTS: usize = 5;

/// Parquet compression applied to catalog and validation batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParquetCompression {
    /// Snappy (default)
    #[default]
    Snappy,
    /// Gzip
    Gzip,
    /// Uncompressed
    None,
}

impl ParquetCompression {
    /// Parse the configuration string form (`SNAPPY` | `GZIP` | `NONE`)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SNAPPY" => Some(ParquetCompression::Snappy),
            "GZIP" => Some(ParquetCompression::Gzip),
            "NONE" => Some(ParquetCompression::None),
            _ => None,
        }
    }
}

/// Deploy-time choice of blob store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    /// Gzip-compressed files under a hex-nibble directory partition
    #[default]
    Fs,
    /// Per-network embedded SQLite database
    Sql,
    /// Per-network embedded key/value database
    Kv,
}

/// Configuration recognized by the core
///
/// Field defaults match the documented configuration keys:
///
/// | key | field | default |
/// |---|---|---|
/// | `store.basepath` | `base_path` | `/tmp/data` |
/// | `parquet.catalog.records-per-file` | `catalog_records_per_file` | 100 000 |
/// | `parquet.validation.records-per-file` | `validation_records_per_file` | 100 000 |
/// | `parquet.compression` | `compression` | `SNAPPY` |
/// | `parquet.page.size` | `page_size` | 1 048 576 |
/// | `parquet.enable.dictionary` | `enable_dictionary` | true |
/// | `parquet.validation.cache-max-snapshots` | `cache_max_snapshots` | 5 |
/// | `parquet.validation.cache-ttl-minutes` | `cache_ttl_minutes` | 30 |
/// | `catalog.batch.size` | `catalog_batch_size` | 5000 |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory of the store
    pub base_path: PathBuf,
    /// Catalog batch flush threshold (records per Parquet file)
    pub catalog_records_per_file: usize,
    /// Validation batch flush threshold (records per Parquet file)
    pub validation_records_per_file: usize,
    /// Parquet compression codec
    pub compression: ParquetCompression,
    /// Parquet page size in bytes
    pub page_size: usize,
    /// Parquet dictionary encoding
    pub enable_dictionary: bool,
    /// Validation cache capacity in snapshots (minimum 5 enforced)
    pub cache_max_snapshots: usize,
    /// Validation cache idle TTL in minutes
    pub cache_ttl_minutes: u64,
    /// Rows per batched insert for the SQL blob backend
    pub catalog_batch_size: usize,
    /// Blob store backend
    pub blob_backend: BlobBackend,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            base_path: PathBuf::from("/tmp/data"),
            catalog_records_per_file: 100_000,
            validation_records_per_file: 100_000,
            compression: ParquetCompression::Snappy,
            page_size: 1_048_576,
            enable_dictionary: true,
            cache_max_snapshots: MIN_CACHE_SNAPSHOTS,
            cache_ttl_minutes: 30,
            catalog_batch_size: 5000,
            blob_backend: BlobBackend::Fs,
        }
    }
}

impl StoreConfig {
    /// Create a config rooted at the given base path
    pub fn rooted_at(base_path: impl AsRef<Path>) -> Self {
        StoreConfig {
            base_path: base_path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Create a config for tests: tiny batches so rollover paths execute
    pub fn for_testing(base_path: impl AsRef<Path>) -> Self {
        StoreConfig {
            base_path: base_path.as_ref().to_path_buf(),
            catalog_records_per_file: 4,
            validation_records_per_file: 4,
            cache_ttl_minutes: 30,
            ..Default::default()
        }
    }

    /// Set the catalog batch threshold
    pub fn with_catalog_records_per_file(mut self, n: usize) -> Self {
        self.catalog_records_per_file = n;
        self
    }

    /// Set the validation batch threshold
    pub fn with_validation_records_per_file(mut self, n: usize) -> Self {
        self.validation_records_per_file = n;
        self
    }

    /// Set the Parquet compression codec
    pub fn with_compression(mut self, compression: ParquetCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Set the cache capacity (values below the minimum are raised at use)
    pub fn with_cache_max_snapshots(mut self, n: usize) -> Self {
        self.cache_max_snapshots = n;
        self
    }

    /// Set the cache idle TTL
    pub fn with_cache_ttl_minutes(mut self, minutes: u64) -> Self {
        self.cache_ttl_minutes = minutes;
        self
    }

    /// Set the blob backend
    pub fn with_blob_backend(mut self, backend: BlobBackend) -> Self {
        self.blob_backend = backend;
        self
    }

    /// Effective cache capacity with the documented minimum enforced
    pub fn effective_cache_capacity(&self) -> usize {
        self.cache_max_snapshots.max(MIN_CACHE_SNAPSHOTS)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog_records_per_file == 0 {
            return Err(ConfigError::ZeroBatchThreshold("catalog"));
        }
        if self.validation_records_per_file == 0 {
            return Err(ConfigError::ZeroBatchThreshold("validation"));
        }
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.catalog_batch_size == 0 {
            return Err(ConfigError::ZeroBatchThreshold("sql catalog"));
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A records-per-file threshold was zero
    #[error("{0} records-per-file threshold must be positive")]
    ZeroBatchThreshold(&'static str),

    /// Page size was zero
    #[error("parquet page size must be positive")]
    ZeroPageSize,
}
