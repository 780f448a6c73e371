//! Queries over a snapshot's validation records
//!
//! Filters, aggregate stats, rule-occurrence histograms, and paginated
//! views, all served from the materialized record list held by the cache.

mod filter;
mod service;
mod stats;

pub use filter::{parse_filters, RecordFilter};
pub use service::{PaginatedRecords, QueryService};
pub use stats::{RuleOccurrences, RuleStats, ValidationStats};
