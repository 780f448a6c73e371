//! # oaistore
//!
//! Snapshot-oriented storage core for harvested OAI-PMH metadata.
//!
//! Records harvested from remote repositories are organized as immutable,
//! per-source snapshots moving through a documented lifecycle
//! (harvesting → validated → indexed → deleted). Payloads live in a
//! content-addressed, deduplicating blob store; the record catalog and the
//! per-record validation outcomes persist as batched Parquet streams with
//! a lightweight index projection and an LRU-cached query service on top.
//!
//! # Quick Start
//!
//! ```no_run
//! use oaistore::{HarvestStore, HarvestedRecord, NetworkRef, StoreConfig};
//!
//! fn main() -> oaistore::Result<()> {
//!     let store = HarvestStore::open(StoreConfig::rooted_at("./data"))?;
//!     let network = NetworkRef::new(1, "demo");
//!
//!     let snapshot = store.create_snapshot(&network)?;
//!     store.start_harvesting(&snapshot)?;
//!     store.store_record(
//!         &snapshot,
//!         &HarvestedRecord {
//!             identifier: "oai:demo:1".into(),
//!             datestamp: 1_650_000_000_000,
//!             deleted: false,
//!             content: "<metadata/>".into(),
//!         },
//!     )?;
//!     store.finish_harvesting(&snapshot)?;
//!
//!     for record in store.records(&snapshot)?.iter() {
//!         println!("{}", record?.identifier);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! [`HarvestStore`] is the main entry point; it owns the snapshot
//! lifecycle store, the per-network blob pool, the catalog and validation
//! writer registries, and the query service. The XOAI document helper and
//! the format transformer registry are exposed for the transformation and
//! validation collaborators.

// Re-export the public API
pub use oaistore_core::{
    BlobBackend, IndexStatus, NetworkRef, OaiRecord, ParquetCompression, RecordObservation,
    RecordStatus, RecordValidation, Result, RuleFact, SnapshotId, SnapshotMeta, SnapshotStatus,
    StopSignal, StoreConfig, StoreError, StorePaths,
};
pub use oaistore_engine::{HarvestStore, HarvestedRecord};

pub use oaistore_blobstore as blobstore;
pub use oaistore_records as records;
pub use oaistore_snapshot as snapshot;
pub use oaistore_xoai as xoai;
