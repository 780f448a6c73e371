//! Columnar record persistence and queries
//!
//! This crate owns everything that lives under a snapshot's `catalog/` and
//! `validation/` directories:
//!
//! - **Catalog**: the append-only, batched Parquet stream of `OaiRecord`
//!   rows, one stream per snapshot, plus forward-only readers.
//! - **Validation**: the parallel Parquet stream of `RecordValidation`
//!   rows (nested rule facts) and the single overwriteable lightweight
//!   index file.
//! - **Cache**: an LRU of materialized validation record lists keyed by
//!   snapshot id.
//! - **Query**: the filter grammar, aggregate stats, rule-occurrence
//!   histograms, and paginated views served from the cache.
//!
//! Batch files are published atomically (written under a temporary name,
//! renamed on close), so readers never observe a partial batch.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod catalog;
mod parquet_util;
pub mod query;
pub mod validation;

pub use cache::ValidationCache;
pub use catalog::{CatalogReader, CatalogWriter, CatalogWriterRegistry};
pub use query::{
    parse_filters, PaginatedRecords, QueryService, RecordFilter, RuleOccurrences, RuleStats,
    ValidationStats,
};
pub use validation::{
    ValidationReader, ValidationWriter, ValidationWriterRegistry,
};
