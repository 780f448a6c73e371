//! Engine facade
//!
//! [`HarvestStore`] is the main entry point: it owns the snapshot store,
//! the per-network blob pool, the catalog and validation writer
//! registries, and the query service, and drives the cross-component
//! operations (record ingest, validation ingest, incremental harvests,
//! snapshot cleanup).

#![warn(missing_docs)]
#![warn(clippy::all)]

mod incremental;
mod store;

pub use store::{HarvestStore, HarvestedRecord};
