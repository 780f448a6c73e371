//! Query service over cached validation records
//!
//! Amortizes the Parquet scan cost: the first query against a snapshot
//! materializes its full record list into the LRU cache; later queries
//! filter in memory. Pagination is stable: with no intervening writes,
//! repeating a query returns identical pages.

use std::sync::Arc;

use oaistore_core::{
    RecordObservation, RecordStatus, RecordValidation, Result, SnapshotMeta, StoreConfig,
    StorePaths,
};

use crate::cache::ValidationCache;
use crate::validation::ValidationReader;

use super::filter::{matches_all, parse_filters};
use super::stats::{RuleOccurrences, ValidationStats};

/// Default page size of the id-cursor pagination
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// One page of a filtered query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedRecords {
    /// Records in this page
    pub records: Vec<RecordValidation>,
    /// Total records passing the filters, across all pages
    pub total_filtered: u64,
}

/// Filtered, paginated views over a snapshot's validation records
pub struct QueryService {
    paths: StorePaths,
    cache: Arc<ValidationCache>,
}

impl QueryService {
    /// Create a service sharing the given cache
    pub fn new(config: &StoreConfig, cache: Arc<ValidationCache>) -> Self {
        QueryService {
            paths: StorePaths::new(&config.base_path),
            cache,
        }
    }

    /// The shared cache (writers invalidate through it)
    pub fn cache(&self) -> &Arc<ValidationCache> {
        &self.cache
    }

    fn load_records(&self, meta: &SnapshotMeta) -> Result<Arc<Vec<RecordValidation>>> {
        let dir = self.paths.validation_dir(&meta.network, meta.id);
        self.cache
            .get_or_load(meta.id, || ValidationReader::open(&dir)?.load_all())
    }

    /// Aggregate stats over the records passing the filters
    pub fn build_stats(&self, meta: &SnapshotMeta, filters: &[String]) -> Result<ValidationStats> {
        let records = self.load_records(meta)?;
        let filters = parse_filters(filters);
        Ok(ValidationStats::aggregate(
            records.iter().filter(|r| matches_all(&filters, r)),
        ))
    }

    /// Histogram one rule's occurrence values over the filtered records
    pub fn calculate_rule_occurrences(
        &self,
        meta: &SnapshotMeta,
        rule_id: i32,
        filters: &[String],
    ) -> Result<RuleOccurrences> {
        let records = self.load_records(meta)?;
        let filters = parse_filters(filters);
        Ok(RuleOccurrences::aggregate(
            records.iter().filter(|r| matches_all(&filters, r)),
            rule_id,
        ))
    }

    /// One page of the filtered records, by offset and limit
    pub fn query_observations_with_pagination(
        &self,
        meta: &SnapshotMeta,
        filters: &[String],
        offset: usize,
        limit: usize,
    ) -> Result<PaginatedRecords> {
        let records = self.load_records(meta)?;
        let filters = parse_filters(filters);

        let mut total_filtered = 0u64;
        let mut page = Vec::new();
        for record in records.iter() {
            if !matches_all(&filters, record) {
                continue;
            }
            if total_filtered as usize >= offset && page.len() < limit {
                page.push(record.clone());
            }
            total_filtered += 1;
        }
        Ok(PaginatedRecords {
            records: page,
            total_filtered,
        })
    }

    /// Lightweight projection filtered by status
    ///
    /// Served from the index file, not the cache; this is the large-scan
    /// path.
    pub fn list_by_status(
        &self,
        meta: &SnapshotMeta,
        status: RecordStatus,
    ) -> Result<Vec<RecordObservation>> {
        let dir = self.paths.validation_dir(&meta.network, meta.id);
        ValidationReader::open(&dir)?.load_lightweight_index(status)
    }

    /// One cursor page of the lightweight projection, id-ascending
    ///
    /// Returns records with `record_id > last_seen_id`, up to `page_size`
    /// (default 1000 when zero). The cursor for the next page is the last
    /// returned record's id.
    pub fn page_after(
        &self,
        meta: &SnapshotMeta,
        status: RecordStatus,
        last_seen_id: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<RecordObservation>> {
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };
        let mut rows: Vec<(String, RecordObservation)> = self
            .list_by_status(meta, status)?
            .into_iter()
            .map(|obs| (obs.record_id(), obs))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(rows
            .into_iter()
            .filter(|(id, _)| match last_seen_id {
                Some(cursor) => id.as_str() > cursor,
                None => true,
            })
            .take(page_size)
            .map(|(_, obs)| obs)
            .collect())
    }
}
